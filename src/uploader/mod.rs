//! File uploads to a pinning service
//!
//! A batch is fanned out as independent uploads that are all in flight at
//! once. The batch succeeds only if every upload succeeds; the first failure
//! aborts the whole call and partial results are dropped. Content that was
//! already pinned before the failure stays pinned.

pub mod pinata;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument};

use crate::config::Settings;
use crate::error::{Error, Result};
use pinata::{PinataCredentials, PinataProvider};

/// Accepts padded or unpadded input and ignores stray trailing bits
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// One file to pin: a caller-chosen identifier (used as the filename) and its bytes
#[derive(Clone, PartialEq, Eq)]
pub struct UploadRequest {
    identifier: String,
    content: Vec<u8>,
}

impl UploadRequest {
    pub fn new(identifier: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            identifier: identifier.into(),
            content,
        }
    }

    /// Build a request from base64-encoded content. Line breaks, missing
    /// padding and the URL-safe alphabet (`-`, `_`) are all accepted.
    pub fn from_base64(identifier: impl Into<String>, content: &str) -> Result<Self> {
        let identifier = identifier.into();
        let normalized: String = content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                c => c,
            })
            .collect();
        let content = LENIENT_BASE64
            .decode(normalized)
            .map_err(|e| Error::UploadError(format!("invalid base64 content for {identifier}: {e}")))?;
        Ok(Self {
            identifier,
            content,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.identifier, self.content)
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("identifier", &self.identifier)
            .field("size", &self.content.len())
            .finish()
    }
}

/// Opaque content identifier (CID) handed out by the pinning service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentIdentifier(String);

impl ContentIdentifier {
    pub fn new(cid: impl Into<String>) -> Self {
        Self(cid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait PinningProvider: Send + Sync {
    /// Pin a single file and return its content identifier
    async fn pin_file(&self, request: UploadRequest) -> Result<ContentIdentifier>;
}

/// Fans uploads out to a [`PinningProvider`]
#[derive(Clone)]
pub struct Uploader {
    provider: Arc<dyn PinningProvider>,
    in_flight: Option<Arc<Semaphore>>,
}

impl Uploader {
    pub fn new(provider: Arc<dyn PinningProvider>) -> Self {
        Self {
            provider,
            in_flight: None,
        }
    }

    /// Limit how many uploads run at the same time. The limit is shared by every
    /// clone of this uploader and every batch in progress. Zero means no limit.
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.in_flight = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        self
    }

    /// Uploader backed by Pinata, configured from settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let credentials = PinataCredentials::new(
            settings.pinata_api_key.clone(),
            settings.pinata_secret_api_key.clone(),
        );
        let provider = PinataProvider::new(
            settings.pinata_url.clone(),
            credentials,
            settings.request_timeout(),
        )?;
        Ok(Self::new(Arc::new(provider)).with_max_in_flight(settings.max_in_flight_uploads))
    }

    /// Upload every item concurrently. The returned identifiers are in input order.
    #[instrument(skip_all, fields(count = items.len()))]
    pub async fn upload_batch(&self, items: Vec<UploadRequest>) -> Result<Vec<ContentIdentifier>> {
        info!(
            files = ?items.iter().map(UploadRequest::identifier).collect::<Vec<_>>(),
            "Uploading files to pinning service"
        );

        let uploads = items.into_iter().map(|item| self.upload_item(item));
        let cids = try_join_all(uploads).await.map_err(|e| {
            error!("Error uploading files to IPFS: {}", e);
            match e {
                Error::UploadError(_) => e,
                other => Error::UploadError(other.to_string()),
            }
        })?;

        info!("All files uploaded successfully");
        for cid in &cids {
            debug!(%cid, "IPFS hash (CID)");
        }

        Ok(cids)
    }

    /// Upload a single item; same contract as a batch of one
    pub async fn upload_one(&self, item: UploadRequest) -> Result<ContentIdentifier> {
        self.upload_batch(vec![item])
            .await?
            .pop()
            .ok_or_else(|| Error::UploadError("pinning service returned no identifier".to_string()))
    }

    async fn upload_item(&self, item: UploadRequest) -> Result<ContentIdentifier> {
        let _permit = match &self.in_flight {
            Some(semaphore) => Some(
                semaphore
                    .acquire()
                    .await
                    .map_err(|e| Error::UploadError(e.to_string()))?,
            ),
            None => None,
        };
        self.provider.pin_file(item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers with "cid-<identifier>" after a delay that shrinks with position,
    /// so later items finish first.
    struct ReversedLatencyProvider {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ReversedLatencyProvider {
        fn new() -> Self {
            Self {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PinningProvider for ReversedLatencyProvider {
        async fn pin_file(&self, request: UploadRequest) -> Result<ContentIdentifier> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = 50u64.saturating_sub(request.content().len() as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            if request.identifier() == "broken.bin" {
                return Err(Error::RpcError {
                    code: 503,
                    message: "simulated outage".to_string(),
                });
            }
            Ok(ContentIdentifier::new(format!("cid-{}", request.identifier())))
        }
    }

    fn batch(names: &[&str]) -> Vec<UploadRequest> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| UploadRequest::new(*name, vec![0u8; i]))
            .collect()
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        let uploader = Uploader::new(Arc::new(ReversedLatencyProvider::new()));
        let cids = uploader
            .upload_batch(batch(&["a.txt", "b.txt", "c.txt", "d.txt"]))
            .await
            .unwrap();
        let cids: Vec<_> = cids.iter().map(ContentIdentifier::as_str).collect();
        assert_eq!(cids, vec!["cid-a.txt", "cid-b.txt", "cid-c.txt", "cid-d.txt"]);
    }

    #[tokio::test]
    async fn test_uploads_run_concurrently() {
        let provider = Arc::new(ReversedLatencyProvider::new());
        let uploader = Uploader::new(provider.clone());
        uploader
            .upload_batch(batch(&["a", "b", "c", "d"]))
            .await
            .unwrap();
        assert!(provider.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_max_in_flight_caps_concurrency() {
        let provider = Arc::new(ReversedLatencyProvider::new());
        let uploader = Uploader::new(provider.clone()).with_max_in_flight(1);
        let cids = uploader
            .upload_batch(batch(&["a", "b", "c"]))
            .await
            .unwrap();
        assert_eq!(cids.len(), 3);
        assert_eq!(provider.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_failure_fails_the_batch() {
        let uploader = Uploader::new(Arc::new(ReversedLatencyProvider::new()));
        let err = uploader
            .upload_batch(batch(&["a.txt", "broken.bin", "c.txt"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UploadError(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_upload_one_returns_the_single_cid() {
        let uploader = Uploader::new(Arc::new(ReversedLatencyProvider::new()));
        let cid = uploader
            .upload_one(UploadRequest::new("report.pdf", b"%PDF".to_vec()))
            .await
            .unwrap();
        assert_eq!(cid.as_str(), "cid-report.pdf");
    }

    #[tokio::test]
    async fn test_empty_batch_is_empty() {
        let uploader = Uploader::new(Arc::new(ReversedLatencyProvider::new()));
        assert!(uploader.upload_batch(Vec::new()).await.unwrap().is_empty());
    }

    #[test]
    fn test_from_base64_decodes_content() {
        let request = UploadRequest::from_base64("hello.txt", "aGVsbG8=").unwrap();
        assert_eq!(request.content(), b"hello");
        assert_eq!(request.identifier(), "hello.txt");
    }

    #[test]
    fn test_from_base64_accepts_unpadded_wrapped_and_url_safe() {
        assert_eq!(UploadRequest::from_base64("a.txt", "YQ").unwrap().content(), b"a");
        assert_eq!(
            UploadRequest::from_base64("a.txt", "aGVs\nbG8=").unwrap().content(),
            b"hello"
        );
        assert_eq!(
            UploadRequest::from_base64("a.txt", "aGVs\r\n bG8\n").unwrap().content(),
            b"hello"
        );
        assert_eq!(
            UploadRequest::from_base64("a.txt", "-_8=").unwrap().content(),
            &[0xfb, 0xff]
        );
        assert_eq!(
            UploadRequest::from_base64("a.txt", "+/8=").unwrap().content(),
            &[0xfb, 0xff]
        );
    }

    #[tokio::test]
    async fn test_max_in_flight_is_shared_across_clones() {
        let provider = Arc::new(ReversedLatencyProvider::new());
        let uploader = Uploader::new(provider.clone()).with_max_in_flight(1);
        let other = uploader.clone();
        let (a, b) = tokio::join!(
            uploader.upload_batch(batch(&["a", "b"])),
            other.upload_batch(batch(&["c", "d"]))
        );
        assert_eq!(a.unwrap().len() + b.unwrap().len(), 4);
        assert_eq!(provider.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_base64_rejects_garbage() {
        let err = UploadRequest::from_base64("x", "***").unwrap_err();
        assert!(matches!(err, Error::UploadError(_)));
    }

    #[test]
    fn test_debug_hides_content() {
        let request = UploadRequest::new("secret.txt", b"top secret".to_vec());
        let rendered = format!("{request:?}");
        assert!(rendered.contains("size: 10"));
        assert!(!rendered.contains("top secret"));
    }
}
