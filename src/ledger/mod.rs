//! Ledger adapter
//!
//! Owns the connection to the blockchain node and the handle on the deployed
//! ledger contract. The connection is established once, on first use, and
//! reused for the lifetime of the adapter; there is no disconnect.
//!
//! ## Operations
//!
//! - `list_records`: read-only `getter()` call, decoded and normalized
//! - `append_record`: pin the file, then `setter(cid, label)` from the sender account
//! - `list_accounts`: accounts known to the node
//!
//! `list_records` and `append_record` connect on demand. `list_accounts` does
//! not need the contract and talks to the node directly.

pub mod abi;
pub mod artifact;
pub mod contract;
pub mod rpc;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{error, info, instrument, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::normalize::{normalize_json, outputs_to_json};
use crate::uploader::{ContentIdentifier, UploadRequest, Uploader};
use abi::Token;
use artifact::ContractArtifact;
use contract::Contract;
use rpc::{CallRequest, JsonRpcClient, LedgerNode};

/// Read entry point of the ledger contract
pub const GETTER: &str = "getter";
/// Write entry point of the ledger contract
pub const SETTER: &str = "setter";

/// Established connection: which network we are on and the contract deployed there
#[derive(Debug, Clone)]
pub struct LedgerConnection {
    pub node_url: String,
    pub network_id: String,
    pub contract: Contract,
}

/// One entry appended to the ledger: a pinned CID and the label it is filed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub content_identifier: ContentIdentifier,
    pub label: String,
}

impl LedgerRecord {
    /// Arguments of the contract's `setter(string,string)`
    fn setter_args(&self) -> [Token; 2] {
        [
            Token::String(self.content_identifier.to_string()),
            Token::String(self.label.clone()),
        ]
    }
}

/// Tunables for ledger calls
#[derive(Debug, Clone)]
pub struct LedgerOptions {
    pub node_url: String,
    pub sender_account: String,
    pub gas_limit: u64,
    pub receipt_poll_attempts: u32,
    pub receipt_poll_interval: Duration,
}

impl From<&Settings> for LedgerOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            node_url: settings.node_url.clone(),
            sender_account: settings.sender_account.clone(),
            gas_limit: settings.gas_limit,
            receipt_poll_attempts: settings.receipt_poll_attempts,
            receipt_poll_interval: settings.receipt_poll_interval(),
        }
    }
}

pub struct LedgerAdapter {
    node: Arc<dyn LedgerNode>,
    artifact: ContractArtifact,
    uploader: Uploader,
    options: LedgerOptions,
    connection: OnceCell<LedgerConnection>,
}

impl LedgerAdapter {
    pub fn new(
        node: Arc<dyn LedgerNode>,
        artifact: ContractArtifact,
        uploader: Uploader,
        options: LedgerOptions,
    ) -> Self {
        Self {
            node,
            artifact,
            uploader,
            options,
            connection: OnceCell::new(),
        }
    }

    /// Adapter talking JSON-RPC to the configured node and uploading through Pinata
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let artifact = ContractArtifact::load(&settings.contract_artifact).await?;
        let node = JsonRpcClient::new(settings.node_url.clone(), settings.request_timeout())?;
        let uploader = Uploader::from_settings(settings)?;
        Ok(Self::new(
            Arc::new(node),
            artifact,
            uploader,
            LedgerOptions::from(settings),
        ))
    }

    pub fn uploader(&self) -> &Uploader {
        &self.uploader
    }

    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    /// The established connection, without connecting
    pub fn connection(&self) -> Result<&LedgerConnection> {
        self.connection.get().ok_or(Error::NotConnected)
    }

    /// Connect if not yet connected. Concurrent callers share a single attempt;
    /// a failed attempt leaves the adapter unconnected so a later call retries.
    pub async fn ensure_connected(&self) -> Result<&LedgerConnection> {
        self.connection.get_or_try_init(|| self.connect()).await
    }

    #[instrument(skip(self), fields(node = %self.options.node_url))]
    async fn connect(&self) -> Result<LedgerConnection> {
        let network_id = self.node.network_id().await.map_err(|e| {
            error!("Error detecting network id: {}", e);
            Error::ConnectionError(format!("node {} unreachable: {e}", self.options.node_url))
        })?;

        let deployment = self.artifact.deployment(&network_id).ok_or_else(|| {
            Error::ConnectionError(format!(
                "{} is not deployed on network {network_id}",
                self.artifact.display_name()
            ))
        })?;

        let contract = Contract::from_artifact(&self.artifact, &deployment.address)
            .map_err(|e| Error::ConnectionError(e.to_string()))?;

        info!(
            network_id = %network_id,
            contract = %contract.address(),
            "Connected to ledger contract {}",
            self.artifact.display_name()
        );

        Ok(LedgerConnection {
            node_url: self.options.node_url.clone(),
            network_id,
            contract,
        })
    }

    /// All records stored in the contract, with integers rendered as decimal strings
    #[instrument(skip(self))]
    pub async fn list_records(&self) -> Result<Value> {
        let connection = self.ensure_connected().await?;
        self.read_records(connection).await.map_err(|e| {
            error!("Error fetching records: {}", e);
            match e {
                Error::ReadError(_) => e,
                other => Error::ReadError(other.to_string()),
            }
        })
    }

    async fn read_records(&self, connection: &LedgerConnection) -> Result<Value> {
        let getter = connection.contract.function(GETTER)?;
        let request = CallRequest::new(
            None,
            connection.contract.address(),
            &getter.encode_call(&[])?,
            self.options.gas_limit,
        );
        let output = self.node.call(&request).await?;
        let decoded = getter.decode_output(&output)?;
        Ok(outputs_to_json(&decoded))
    }

    /// Pin the file, then record its CID under `label`. Returns the normalized receipt.
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn append_record(&self, file_path: &str, content: Vec<u8>, label: &str) -> Result<Value> {
        let connection = self.ensure_connected().await?;
        let cid = self
            .uploader
            .upload_one(UploadRequest::new(file_path, content))
            .await?;
        info!(%cid, "Pinned {}", file_path);

        let record = LedgerRecord {
            content_identifier: cid,
            label: label.to_string(),
        };
        self.write_record(connection, &record).await.map_err(|e| {
            error!("Error adding record to the contract: {}", e);
            match e {
                Error::WriteError(_) => e,
                other => Error::WriteError(other.to_string()),
            }
        })
    }

    async fn write_record(
        &self,
        connection: &LedgerConnection,
        record: &LedgerRecord,
    ) -> Result<Value> {
        let setter = connection.contract.function(SETTER)?;
        let data = setter.encode_call(&record.setter_args())?;
        let request = CallRequest::new(
            Some(self.options.sender_account.clone()),
            connection.contract.address(),
            &data,
            self.options.gas_limit,
        );

        let tx_hash = self.node.send_transaction(&request).await?;
        let receipt = self.wait_for_receipt(&tx_hash).await?;

        if receipt.get("status").and_then(Value::as_str) == Some("0x0") {
            return Err(Error::WriteError(format!("transaction {tx_hash} reverted")));
        }

        info!(
            %tx_hash,
            cid = %record.content_identifier,
            label = %record.label,
            "Record stored on ledger"
        );
        Ok(normalize_json(receipt))
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<Value> {
        let attempts = self.options.receipt_poll_attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(receipt) = self.node.transaction_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            if attempt == attempts {
                break;
            }
            if attempt == 1 {
                warn!(%tx_hash, "Transaction not mined yet, polling for receipt");
            }
            tokio::time::sleep(self.options.receipt_poll_interval).await;
        }
        Err(Error::WriteError(format!("no receipt for transaction {tx_hash}")))
    }

    /// Accounts known to the node
    #[instrument(skip(self))]
    pub async fn list_accounts(&self) -> Result<Vec<String>> {
        self.node.accounts().await.map_err(|e| {
            error!("Error fetching accounts: {}", e);
            Error::AccountError(e.to_string())
        })
    }
}
