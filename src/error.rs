//! Central error types for pin-ledger
//!
//! Each component catches collaborator failures (pinning service, node,
//! ABI coding) and surfaces them as one of the coarse component variants
//! below, keeping the original message.

use thiserror::Error;

/// Central error type for pin-ledger
#[derive(Error, Debug)]
pub enum Error {
    /// The pinning service rejected an upload or was unreachable
    #[error("Upload failed: {0}")]
    UploadError(String),

    /// Node unreachable, or no contract deployment for the node's network
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    /// Ledger operation attempted before the connection was established
    #[error("Ledger connection not initialized")]
    NotConnected,

    /// Read-only contract call failed
    #[error("Failed to read records: {0}")]
    ReadError(String),

    /// Contract transaction rejected, reverted or never mined
    #[error("Failed to write record: {0}")]
    WriteError(String),

    /// Account listing failed
    #[error("Failed to list accounts: {0}")]
    AccountError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed request input, such as undecodable file content
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON-RPC error object returned by the node
    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    /// Contract ABI parsing, encoding or decoding error
    #[error("ABI error: {0}")]
    AbiError(String),

    /// HTTP request error (from reqwest)
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for pin-ledger operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// True when the failure was caused by the caller's input rather than a collaborator
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ConfigError(_) | Error::InvalidInput(_) | Error::AbiError(_)
        )
    }

    /// Convert to a human-readable message for API responses
    pub fn status_message(&self) -> String {
        match self {
            Error::UploadError(msg) => format!("An error occurred while uploading files to IPFS: {msg}"),
            Error::ConnectionError(msg) => format!("Ledger unavailable: {msg}"),
            Error::ReadError(msg) => format!("Failed to fetch records from the contract: {msg}"),
            Error::WriteError(msg) => format!("Failed to add record to the contract: {msg}"),
            Error::AccountError(msg) => format!("Failed to fetch accounts: {msg}"),
            Error::HttpError(e) => format!("HTTP request failed: {e}"),
            _ => self.to_string(),
        }
    }
}
