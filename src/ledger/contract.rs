use std::collections::HashMap;

use super::abi::{self, checksum_address, parse_address, ParamType, Token};
use super::artifact::{AbiEntry, ContractArtifact};
use crate::error::{Error, Result};

/// A callable contract function resolved from the ABI
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    inputs: Vec<ParamType>,
    outputs: Vec<(String, ParamType)>,
}

impl Function {
    pub fn from_entry(entry: &AbiEntry) -> Result<Self> {
        let inputs = entry
            .inputs
            .iter()
            .map(ParamType::from_abi)
            .collect::<Result<Vec<_>>>()?;
        let outputs = entry
            .outputs
            .iter()
            .map(|p| Ok((p.name.clone(), ParamType::from_abi(p)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: entry.name.clone(),
            inputs,
            outputs,
        })
    }

    pub fn signature(&self) -> String {
        let inputs: Vec<String> = self.inputs.iter().map(ParamType::canonical).collect();
        format!("{}({})", self.name, inputs.join(","))
    }

    /// Selector followed by the encoded arguments
    pub fn encode_call(&self, args: &[Token]) -> Result<Vec<u8>> {
        if args.len() != self.inputs.len() {
            return Err(Error::AbiError(format!(
                "{} expects {} argument(s), got {}",
                self.signature(),
                self.inputs.len(),
                args.len()
            )));
        }
        if let Some((i, _)) = args
            .iter()
            .zip(&self.inputs)
            .enumerate()
            .find(|(_, (arg, ty))| !arg.matches(ty))
        {
            return Err(Error::AbiError(format!(
                "argument {i} of {} is not a {}",
                self.signature(),
                self.inputs[i].canonical()
            )));
        }

        let mut data = abi::selector(&self.signature()).to_vec();
        data.extend(abi::encode(args)?);
        Ok(data)
    }

    /// Decode return data into named output values
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<(String, Token)>> {
        let types: Vec<ParamType> = self.outputs.iter().map(|(_, p)| p.clone()).collect();
        let values = abi::decode(&types, data)?;
        Ok(self
            .outputs
            .iter()
            .map(|(name, _)| name.clone())
            .zip(values)
            .collect())
    }
}

/// Contract handle: deployment address plus its callable functions
#[derive(Debug, Clone)]
pub struct Contract {
    address: [u8; 20],
    functions: HashMap<String, Function>,
}

impl Contract {
    pub fn from_artifact(artifact: &ContractArtifact, address: &str) -> Result<Self> {
        let address = parse_address(address)?;
        let mut functions = HashMap::new();
        for entry in artifact.functions() {
            // Overloads are not used by ledger contracts; the first definition wins.
            functions
                .entry(entry.name.clone())
                .or_insert(Function::from_entry(entry)?);
        }
        Ok(Self { address, functions })
    }

    pub fn address(&self) -> String {
        checksum_address(&self.address)
    }

    pub fn function(&self, name: &str) -> Result<&Function> {
        self.functions
            .get(name)
            .ok_or_else(|| Error::AbiError(format!("contract has no function {name}")))
    }
}
