//! Request and response bodies

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::uploader::{ContentIdentifier, UploadRequest};

/// Decode a base64 file body; a bad encoding is the client's fault
fn decode_file(path: String, content: &str) -> Result<UploadRequest> {
    UploadRequest::from_base64(path, content).map_err(|e| match e {
        Error::UploadError(msg) => Error::InvalidInput(msg),
        other => other,
    })
}

/// A file as sent by API clients: a path label plus base64 content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePayload {
    pub path: String,
    pub content: String,
}

impl FilePayload {
    pub fn into_request(self) -> Result<UploadRequest> {
        decode_file(self.path, &self.content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFilesRequest {
    pub files: Vec<FilePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFilesResponse {
    pub cids: Vec<ContentIdentifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendRecordRequest {
    pub path: String,
    pub content: String,
    pub camp: String,
}

impl AppendRecordRequest {
    /// The decoded file and the label to file it under
    pub fn into_parts(self) -> Result<(UploadRequest, String)> {
        Ok((decode_file(self.path, &self.content)?, self.camp))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
