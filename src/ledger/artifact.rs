//! Compiled contract artifacts
//!
//! The artifact is the JSON emitted by the contract build: the ABI plus the
//! address the contract was deployed at on each network id.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::abi::AbiParam;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    #[serde(default)]
    pub contract_name: Option<String>,
    pub abi: Vec<AbiEntry>,
    #[serde(default)]
    pub networks: HashMap<String, NetworkDeployment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDeployment {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
}

fn default_entry_kind() -> String {
    "function".to_string()
}

impl ContractArtifact {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::ConfigError(format!("cannot read contract artifact {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Deployment entry for a network id, as reported by `net_version`
    pub fn deployment(&self, network_id: &str) -> Option<&NetworkDeployment> {
        self.networks.get(network_id)
    }

    pub fn functions(&self) -> impl Iterator<Item = &AbiEntry> {
        self.abi.iter().filter(|entry| entry.kind == "function")
    }

    pub fn display_name(&self) -> &str {
        self.contract_name.as_deref().unwrap_or("contract")
    }
}
