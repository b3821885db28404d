//! Runtime configuration
//!
//! Every option can be given on the command line or through the environment.
//! Credentials that are not set are passed through empty; the pinning service
//! and the node reject them, not this crate.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

pub const DEFAULT_PINATA_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_NODE_URL: &str = "http://127.0.0.1:7545";
pub const DEFAULT_CONTRACT_ARTIFACT: &str = "build/logFileStorage.json";
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Base URL of the Pinata API
    #[arg(long, env = "PINATA_URL", default_value = DEFAULT_PINATA_URL)]
    pub pinata_url: String,

    /// Pinata API key
    #[arg(long, env = "PINATA_API_KEY", default_value = "", hide_env_values = true)]
    pub pinata_api_key: String,

    /// Pinata secret API key
    #[arg(
        long,
        env = "PINATA_SECRET_API_KEY",
        default_value = "",
        hide_env_values = true
    )]
    pub pinata_secret_api_key: String,

    /// JSON-RPC endpoint of the blockchain node
    #[arg(long, env = "NODE_URL", default_value = DEFAULT_NODE_URL)]
    pub node_url: String,

    /// Compiled contract artifact (ABI plus per-network deployment addresses)
    #[arg(long, env = "CONTRACT_ARTIFACT", default_value = DEFAULT_CONTRACT_ARTIFACT)]
    pub contract_artifact: PathBuf,

    /// Account that sends ledger transactions
    #[arg(long, env = "SENDER_ACCOUNT", default_value = "")]
    pub sender_account: String,

    /// Gas allowance for every contract call
    #[arg(long, env = "GAS_LIMIT", default_value_t = DEFAULT_GAS_LIMIT)]
    pub gas_limit: u64,

    /// Timeout applied to every outbound HTTP request
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Cap on concurrent uploads within one batch (0 = unlimited)
    #[arg(long, env = "MAX_IN_FLIGHT_UPLOADS", default_value_t = 0)]
    pub max_in_flight_uploads: usize,

    /// How many times to ask the node for a transaction receipt
    #[arg(long, env = "RECEIPT_POLL_ATTEMPTS", default_value_t = 20)]
    pub receipt_poll_attempts: u32,

    /// Delay between receipt polls in milliseconds
    #[arg(long, env = "RECEIPT_POLL_INTERVAL_MS", default_value_t = 250)]
    pub receipt_poll_interval_ms: u64,
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pinata_url: DEFAULT_PINATA_URL.to_string(),
            pinata_api_key: String::new(),
            pinata_secret_api_key: String::new(),
            node_url: DEFAULT_NODE_URL.to_string(),
            contract_artifact: PathBuf::from(DEFAULT_CONTRACT_ARTIFACT),
            sender_account: String::new(),
            gas_limit: DEFAULT_GAS_LIMIT,
            request_timeout_secs: 60,
            max_in_flight_uploads: 0,
            receipt_poll_attempts: 20,
            receipt_poll_interval_ms: 250,
        }
    }
}
