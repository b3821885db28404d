//! Pin files to IPFS through a pinning service and record their content
//! identifiers on an EVM ledger contract.
//!
//! - [`uploader`]: concurrent, all-or-nothing uploads to the pinning service
//! - [`ledger`]: connection to the node and the ledger contract's read/write entry points
//! - [`normalize`]: JSON-safe rendering of big integers coming off the ledger

pub mod config;
pub mod error;
pub mod ledger;
pub mod normalize;
#[cfg(feature = "rest-api")]
pub mod rest_api;
pub mod telemetry;
pub mod uploader;

pub use config::Settings;
pub use error::{Error, Result};
pub use ledger::{LedgerAdapter, LedgerConnection, LedgerOptions, LedgerRecord};
pub use uploader::{ContentIdentifier, PinningProvider, UploadRequest, Uploader};
