//! Remote image storage.
//!
//! [`ImageHost`] is the seam to the hosting provider; [`CloudinaryClient`]
//! is the production implementation. [`UploadedImageCache`] remembers what
//! the host already stores so bulk imports can skip re-uploading files.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, multipart};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::CloudinaryCredentials;

/// Content types accepted for uploaded images.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedImage {
    pub public_id: String,
    pub bytes: u64,
    pub secure_url: String,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The host refused the upload (HTTP 4xx).
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Image host is not configured")]
    NotConfigured,

    #[error("Image host error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Lists at most `max_results` images already stored on the host.
    async fn list_uploaded(&self, max_results: usize) -> Result<Vec<UploadedImage>, ImageError>;

    async fn upload(&self, image: ImageUpload) -> Result<UploadedImage, ImageError>;
}

#[derive(Debug, Deserialize)]
struct ResourceList {
    resources: Vec<UploadedImage>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    error: CloudinaryErrorMessage,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorMessage {
    message: String,
}

#[derive(Clone)]
pub struct CloudinaryClient {
    client: Client,
    credentials: CloudinaryCredentials,
}

impl CloudinaryClient {
    pub fn new(credentials: CloudinaryCredentials, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{CLOUDINARY_API}/{}/{path}", self.credentials.cloud_name)
    }

    async fn error_from(response: reqwest::Response) -> ImageError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<CloudinaryErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);

        if status.is_client_error() {
            ImageError::Rejected {
                status: status.as_u16(),
                message,
            }
        } else {
            ImageError::Upstream {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Hex SHA-256 over the sorted, `&`-joined parameters followed by the secret.
#[must_use]
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_unstable_by_key(|(key, _)| *key);

    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{joined}{api_secret}").as_bytes()))
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn list_uploaded(&self, max_results: usize) -> Result<Vec<UploadedImage>, ImageError> {
        let response = self
            .client
            .get(self.url("resources/image"))
            .basic_auth(&self.credentials.api_key, Some(&self.credentials.api_secret))
            .query(&[("max_results", max_results.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let list: ResourceList = response.json().await?;
        Ok(list.resources)
    }

    async fn upload(&self, image: ImageUpload) -> Result<UploadedImage, ImageError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(&[("timestamp", timestamp.as_str())], &self.credentials.api_secret);

        let part = multipart::Part::bytes(image.bytes)
            .file_name(image.filename.clone())
            .mime_str(&image.content_type)?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(self.url("image/upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let uploaded: UploadedImage = response.json().await?;
        info!(filename = %image.filename, url = %uploaded.secure_url, "Image uploaded");
        Ok(uploaded)
    }
}

/// Stands in when no Cloudinary credentials are configured.
pub struct DisabledImageHost;

#[async_trait]
impl ImageHost for DisabledImageHost {
    async fn list_uploaded(&self, _max_results: usize) -> Result<Vec<UploadedImage>, ImageError> {
        Err(ImageError::NotConfigured)
    }

    async fn upload(&self, _image: ImageUpload) -> Result<UploadedImage, ImageError> {
        Err(ImageError::NotConfigured)
    }
}

#[derive(Default)]
struct CacheState {
    entries: VecDeque<UploadedImage>,
    loaded_at: Option<Instant>,
}

/// Bounded record of images known to be on the host.
///
/// Populated from the host listing on first use and again once `ttl` has
/// passed or after [`invalidate`](Self::invalidate). Every upload made
/// through the cache is recorded; the oldest entries are evicted past
/// `capacity`.
///
/// Files are matched by byte size only, so two different images of the
/// same size resolve to whichever was uploaded first.
pub struct UploadedImageCache {
    host: Arc<dyn ImageHost>,
    capacity: usize,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl UploadedImageCache {
    #[must_use]
    pub fn new(host: Arc<dyn ImageHost>, capacity: usize, ttl: Duration) -> Self {
        Self {
            host,
            capacity: capacity.max(1),
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.loaded_at = None;
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Uploads without looking for an existing copy.
    pub async fn upload(&self, image: ImageUpload) -> Result<UploadedImage, ImageError> {
        let uploaded = self.host.upload(image).await?;
        let mut state = self.state.lock().await;
        self.remember(&mut state, uploaded.clone());
        Ok(uploaded)
    }

    /// Returns the URL of an image of the same size that is already on the
    /// host, or uploads the file and returns its new URL.
    pub async fn upload_if_not_uploaded(&self, path: &Path) -> Result<String, ImageError> {
        let size = tokio::fs::metadata(path).await?.len();

        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        if let Some(found) = state.entries.iter().find(|image| image.bytes == size) {
            debug!(path = %path.display(), url = %found.secure_url, "Image already uploaded");
            return Ok(found.secure_url.clone());
        }

        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        let uploaded = self
            .host
            .upload(ImageUpload {
                bytes,
                filename,
                content_type,
            })
            .await?;

        let url = uploaded.secure_url.clone();
        self.remember(&mut state, uploaded);
        Ok(url)
    }

    async fn ensure_loaded(&self, state: &mut CacheState) -> Result<(), ImageError> {
        let fresh = state
            .loaded_at
            .is_some_and(|loaded| loaded.elapsed() < self.ttl);
        if fresh {
            return Ok(());
        }

        let listed = self.host.list_uploaded(self.capacity).await?;
        debug!(count = listed.len(), "Loaded uploaded image listing");

        state.entries = listed.into_iter().take(self.capacity).collect();
        state.loaded_at = Some(Instant::now());
        Ok(())
    }

    fn remember(&self, state: &mut CacheState, image: UploadedImage) {
        state.entries.push_back(image);
        while state.entries.len() > self.capacity {
            state.entries.pop_front();
        }
    }
}
