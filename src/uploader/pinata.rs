use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{ContentIdentifier, PinningProvider, UploadRequest};
use crate::error::{Error, Result};

pub const PIN_FILE_PATH: &str = "/pinning/pinFileToIPFS";

const API_KEY_HEADER: &str = "pinata_api_key";
const SECRET_API_KEY_HEADER: &str = "pinata_secret_api_key";

#[derive(Clone)]
pub struct PinataCredentials {
    api_key: String,
    secret_api_key: String,
}

impl PinataCredentials {
    pub fn new(api_key: String, secret_api_key: String) -> Self {
        Self {
            api_key,
            secret_api_key,
        }
    }
}

impl fmt::Debug for PinataCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinataCredentials")
            .field("api_key", &"[REDACTED]")
            .field("secret_api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinFileResponse {
    ipfs_hash: String,
    #[serde(default)]
    pin_size: Option<u64>,
}

pub struct PinataProvider {
    client: Client,
    base_url: String,
    credentials: PinataCredentials,
}

impl PinataProvider {
    pub fn new(base_url: String, credentials: PinataCredentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl PinningProvider for PinataProvider {
    #[instrument(skip_all, fields(file = %request.identifier()))]
    async fn pin_file(&self, request: UploadRequest) -> Result<ContentIdentifier> {
        let (identifier, content) = request.into_parts();
        let form = Form::new().part("file", Part::bytes(content).file_name(identifier));

        let response = self
            .client
            .post(format!("{}{}", self.base_url, PIN_FILE_PATH))
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .header(SECRET_API_KEY_HEADER, &self.credentials.secret_api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::UploadError(format!("pinning service unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UploadError(describe_failure(status, &body)));
        }

        let pinned: PinFileResponse = response
            .json()
            .await
            .map_err(|e| Error::UploadError(format!("unexpected pinning service response: {e}")))?;
        debug!(cid = %pinned.ipfs_hash, size = ?pinned.pin_size, "Pinata upload response");

        Ok(ContentIdentifier::new(pinned.ipfs_hash))
    }
}

/// Pinata reports errors as `{"error": "..."}` or `{"error": {"reason", "details"}}`
fn describe_failure(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match v.get("error")? {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => {
                let reason = obj.get("reason").and_then(Value::as_str).unwrap_or_default();
                match obj.get("details").and_then(Value::as_str) {
                    Some(details) if !reason.is_empty() => Some(format!("{reason}: {details}")),
                    Some(details) => Some(details.to_string()),
                    None => Some(reason.to_string()),
                }
            }
            other => Some(other.to_string()),
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    format!("pinning service returned {status}: {detail}")
}
