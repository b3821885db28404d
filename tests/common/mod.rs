//! Shared fixtures: an in-memory ledger node, a mock pinning service and the
//! ledger contract artifact.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use num_bigint::BigUint;
use serde_json::{json, Value};

use pin_ledger::ledger::abi::{self, ParamType, Token};
use pin_ledger::ledger::artifact::ContractArtifact;
use pin_ledger::ledger::rpc::{self, CallRequest, LedgerNode};
use pin_ledger::{
    ContentIdentifier, Error, LedgerAdapter, LedgerOptions, PinningProvider, Result, UploadRequest,
    Uploader,
};

pub const NETWORK_ID: &str = "5777";
pub const CONTRACT_ADDRESS: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
pub const SENDER: &str = "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1";
pub const TIMESTAMP: u64 = 1_700_000_000;

pub fn artifact_json() -> Value {
    json!({
        "contractName": "logFileStorage",
        "abi": [
            {
                "type": "function",
                "name": "setter",
                "stateMutability": "nonpayable",
                "inputs": [
                    {"name": "_ipfsHash", "type": "string", "internalType": "string"},
                    {"name": "_camp", "type": "string", "internalType": "string"}
                ],
                "outputs": []
            },
            {
                "type": "function",
                "name": "getter",
                "stateMutability": "view",
                "inputs": [],
                "outputs": [{
                    "name": "",
                    "type": "tuple[]",
                    "internalType": "struct logFileStorage.Block[]",
                    "components": [
                        {"name": "id", "type": "uint256"},
                        {"name": "ipfsHash", "type": "string"},
                        {"name": "camp", "type": "string"},
                        {"name": "timestamp", "type": "uint256"}
                    ]
                }]
            }
        ],
        "networks": {
            NETWORK_ID: {"address": CONTRACT_ADDRESS, "transactionHash": "0x01"}
        }
    })
}

pub fn artifact() -> ContractArtifact {
    ContractArtifact::from_json(&artifact_json().to_string()).unwrap()
}

/// Record ids start above 2^64 so every id exceeds double precision
pub fn record_id(index: usize) -> BigUint {
    BigUint::from(u64::MAX) + BigUint::from(index + 1)
}

/// Ledger node keeping setter calls in memory and serving them back through getter
pub struct MemoryLedger {
    pub network_id: String,
    pub accounts: Vec<String>,
    pub records: Mutex<Vec<(String, String)>>,
    pub network_id_calls: AtomicUsize,
    pub transactions: AtomicUsize,
    pub revert: AtomicBool,
    pub pending_receipts: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::on_network(NETWORK_ID)
    }

    pub fn on_network(network_id: &str) -> Self {
        Self {
            network_id: network_id.to_string(),
            accounts: vec![SENDER.to_string()],
            records: Mutex::new(Vec::new()),
            network_id_calls: AtomicUsize::new(0),
            transactions: AtomicUsize::new(0),
            revert: AtomicBool::new(false),
            pending_receipts: AtomicUsize::new(0),
        }
    }

    fn records_token(&self) -> Token {
        let records = self.records.lock().unwrap();
        Token::Array(
            records
                .iter()
                .enumerate()
                .map(|(i, (cid, camp))| {
                    Token::Tuple(vec![
                        ("id".to_string(), Token::Uint(record_id(i))),
                        ("ipfsHash".to_string(), Token::String(cid.clone())),
                        ("camp".to_string(), Token::String(camp.clone())),
                        ("timestamp".to_string(), Token::Uint(BigUint::from(TIMESTAMP))),
                    ])
                })
                .collect(),
        )
    }
}

#[async_trait]
impl LedgerNode for MemoryLedger {
    async fn network_id(&self) -> Result<String> {
        self.network_id_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(self.network_id.clone())
    }

    async fn accounts(&self) -> Result<Vec<String>> {
        Ok(self.accounts.clone())
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>> {
        let data = rpc::decode_hex(&request.data)?;
        assert_eq!(data, abi::selector("getter()").to_vec());
        assert_eq!(request.gas, "0xf4240");
        abi::encode(&[self.records_token()])
    }

    async fn send_transaction(&self, request: &CallRequest) -> Result<String> {
        if request.from.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::RpcError {
                code: -32000,
                message: "sender account not recognized".to_string(),
            });
        }
        let data = rpc::decode_hex(&request.data)?;
        assert_eq!(data[..4], abi::selector("setter(string,string)"));
        let args = abi::decode(&[ParamType::String, ParamType::String], &data[4..])?;
        let n = self.transactions.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.revert.load(Ordering::SeqCst) {
            if let [Token::String(cid), Token::String(camp)] = args.as_slice() {
                self.records.lock().unwrap().push((cid.clone(), camp.clone()));
            }
        }
        Ok(format!("0x{n:064x}"))
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<Value>> {
        let pending = self.pending_receipts.load(Ordering::SeqCst);
        if pending > 0 {
            self.pending_receipts.store(pending - 1, Ordering::SeqCst);
            return Ok(None);
        }
        let status = if self.revert.load(Ordering::SeqCst) { "0x0" } else { "0x1" };
        Ok(Some(json!({
            "transactionHash": tx_hash,
            "from": SENDER,
            "to": CONTRACT_ADDRESS,
            "status": status,
            "blockNumber": "0x2a",
            "gasUsed": "0x1d4c0",
            "cumulativeGasUsed": "0x1d4c0",
            "effectiveGasPrice": "0x4a817c800",
            "logs": []
        })))
    }
}

/// Pinning service stand-in handing out "<prefix><n>" identifiers
pub struct MockPinning {
    pub prefix: String,
    pub fail: AtomicBool,
    pub uploads: Mutex<Vec<UploadRequest>>,
}

impl MockPinning {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            fail: AtomicBool::new(false),
            uploads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PinningProvider for MockPinning {
    async fn pin_file(&self, request: UploadRequest) -> Result<ContentIdentifier> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::UploadError(
                "pinning service returned 401 Unauthorized: INVALID_API_KEYS".to_string(),
            ));
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(request);
        Ok(ContentIdentifier::new(format!("{}{}", self.prefix, uploads.len())))
    }
}

pub fn options() -> LedgerOptions {
    LedgerOptions {
        node_url: "memory://ledger".to_string(),
        sender_account: SENDER.to_string(),
        gas_limit: 1_000_000,
        receipt_poll_attempts: 3,
        receipt_poll_interval: Duration::from_millis(1),
    }
}

pub fn adapter(node: Arc<MemoryLedger>, pinning: Arc<MockPinning>) -> LedgerAdapter {
    LedgerAdapter::new(node, artifact(), Uploader::new(pinning), options())
}
