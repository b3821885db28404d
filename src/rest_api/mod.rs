//! REST API for external integrations
//!
//! Exposes uploads, ledger records and node accounts over HTTP.

mod dto;
mod handlers;
mod server;

pub use dto::{AppendRecordRequest, FilePayload, UploadFilesRequest, UploadFilesResponse};
pub use server::{router, run_server};
