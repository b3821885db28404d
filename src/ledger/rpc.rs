//! JSON-RPC access to the blockchain node

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::trace;

use crate::error::{Error, Result};

/// Parameters of an `eth_call` / `eth_sendTransaction`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    /// `0x`-prefixed call data
    pub data: String,
    /// `0x`-prefixed gas allowance
    pub gas: String,
}

impl CallRequest {
    pub fn new(from: Option<String>, to: String, data: &[u8], gas: u64) -> Self {
        Self {
            from,
            to,
            data: format!("0x{}", hex::encode(data)),
            gas: format!("0x{gas:x}"),
        }
    }
}

/// The node operations the ledger adapter relies on
#[async_trait]
pub trait LedgerNode: Send + Sync {
    /// Network id used to pick the contract deployment
    async fn network_id(&self) -> Result<String>;

    async fn accounts(&self) -> Result<Vec<String>>;

    /// Execute a read-only call against the latest block, returning raw output bytes
    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>>;

    /// Submit a transaction signed by the node, returning its hash
    async fn send_transaction(&self, request: &CallRequest) -> Result<String>;

    /// Receipt of a mined transaction; `None` while pending
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<Value>>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 client over HTTP
pub struct JsonRpcClient {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({"jsonrpc": "2.0", "method": method, "params": params, "id": id});
        trace!(%method, id, "JSON-RPC request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?;
        let status_error = response.error_for_status_ref().err();
        let body = response.bytes().await?;

        // Nodes may pair an error object with a non-2xx status; the object wins.
        let parsed = match serde_json::from_slice::<RpcResponse>(&body) {
            Ok(RpcResponse {
                error: Some(err), ..
            }) => {
                return Err(Error::RpcError {
                    code: err.code,
                    message: err.message,
                })
            }
            other => other,
        };
        if let Some(err) = status_error {
            return Err(err.into());
        }
        let response = parsed?;
        Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
    }
}

#[async_trait]
impl LedgerNode for JsonRpcClient {
    async fn network_id(&self) -> Result<String> {
        let id: Value = self.request("net_version", json!([])).await?;
        // Some nodes answer with a number instead of a decimal string.
        match id {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(Error::RpcError {
                code: -32603,
                message: format!("unexpected net_version result {other}"),
            }),
        }
    }

    async fn accounts(&self) -> Result<Vec<String>> {
        self.request("eth_accounts", json!([])).await
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>> {
        let output: String = self.request("eth_call", json!([request, "latest"])).await?;
        decode_hex(&output)
    }

    async fn send_transaction(&self, request: &CallRequest) -> Result<String> {
        self.request("eth_sendTransaction", json!([request])).await
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<Value>> {
        self.request("eth_getTransactionReceipt", json!([tx_hash]))
            .await
    }
}

pub fn decode_hex(data: &str) -> Result<Vec<u8>> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(digits).map_err(|e| Error::AbiError(format!("invalid hex data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_request_serializes_as_rpc_object() {
        let request = CallRequest::new(None, "0xabc".to_string(), &[0xde, 0xad], 1_000_000);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"to": "0xabc", "data": "0xdead", "gas": "0xf4240"})
        );

        let request = CallRequest::new(Some("0x01".to_string()), "0xabc".to_string(), &[], 21_000);
        assert_eq!(serde_json::to_value(&request).unwrap()["from"], "0x01");
    }

    #[test]
    fn test_decode_hex_accepts_prefix_and_empty() {
        assert_eq!(decode_hex("0x0102").unwrap(), vec![1, 2]);
        assert!(decode_hex("0x").unwrap().is_empty());
        assert!(decode_hex("0xzz").is_err());
    }
}
