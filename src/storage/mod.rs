//! # Image storage
//!
//! Room photos and proof-of-payment scans are pushed to an external image
//! store and only their URLs are kept in the database. [`ImageStore`] is the
//! seam; [`CloudinaryStore`] talks to the Cloudinary upload API and
//! [`MemoryImageStore`] keeps bytes in process for local runs and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{StorageConfig, StorageProvider};

pub mod cloudinary;

pub use cloudinary::CloudinaryStore;

/// Errors returned by image stores.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{file_name}: {reason}")]
    Rejected { file_name: String, reason: String },
    #[error("image store returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("image store unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected image store response: {0}")]
    MalformedResponse(String),
    #[error("image store misconfigured: {0}")]
    Misconfigured(String),
}

/// An image received from a client, ready to upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Where an uploaded image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads one image into `folder` (e.g. `hotel/rooms`).
    async fn upload(&self, folder: &str, image: ImageUpload) -> Result<StoredImage, StorageError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

/// Builds the store selected by configuration.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn ImageStore>, StorageError> {
    match config.provider {
        StorageProvider::Memory => Ok(Arc::new(MemoryImageStore::new(config.max_upload_bytes))),
        StorageProvider::Cloudinary => Ok(Arc::new(CloudinaryStore::from_config(config)?)),
    }
}

/// Checks size and type before anything leaves the process.
pub fn validate_image(image: &ImageUpload, max_bytes: usize) -> Result<(), StorageError> {
    let reject = |reason: String| StorageError::Rejected {
        file_name: image.file_name.clone(),
        reason,
    };

    if image.bytes.is_empty() {
        return Err(reject("file is empty".to_string()));
    }
    if image.bytes.len() > max_bytes {
        return Err(reject(format!(
            "file is {} bytes, the limit is {} bytes",
            image.bytes.len(),
            max_bytes
        )));
    }
    match image.content_type.as_deref() {
        Some(content_type) if content_type.starts_with("image/") => Ok(()),
        Some(other) => Err(reject(format!("content type {other} is not an image"))),
        None => Err(reject("content type is missing".to_string())),
    }
}

/// Result of uploading a batch of images. Failed files become warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub urls: Vec<String>,
    pub warnings: Vec<String>,
}

/// Uploads `images` one by one. A failed file never aborts the batch.
pub async fn upload_all(
    store: &dyn ImageStore,
    folder: &str,
    images: Vec<ImageUpload>,
) -> UploadReport {
    let mut report = UploadReport::default();

    for image in images {
        let file_name = image.file_name.clone();
        match store.upload(folder, image).await {
            Ok(stored) => {
                tracing::debug!(store = store.name(), public_id = %stored.public_id, "Image uploaded");
                report.urls.push(stored.url);
            }
            Err(err) => {
                counter!("image_upload_failures_total", "store" => store.name()).increment(1);
                tracing::warn!(store = store.name(), file_name = %file_name, error = %err, "Image upload failed");
                report
                    .warnings
                    .push(format!("Failed to upload {file_name}: {err}"));
            }
        }
    }

    report
}

/// Keeps uploads in memory and hands out `memory://` URLs.
#[derive(Debug)]
pub struct MemoryImageStore {
    max_bytes: usize,
    images: Mutex<HashMap<String, ImageUpload>>,
}

impl MemoryImageStore {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            images: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.images.lock().map(|images| images.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, public_id: &str) -> Option<ImageUpload> {
        self.images
            .lock()
            .ok()
            .and_then(|images| images.get(public_id).cloned())
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload(&self, folder: &str, image: ImageUpload) -> Result<StoredImage, StorageError> {
        validate_image(&image, self.max_bytes)?;

        let public_id = format!("{}/{}", folder.trim_matches('/'), Uuid::new_v4().simple());
        let url = format!("memory://{public_id}/{}", image.file_name);

        self.images
            .lock()
            .map_err(|_| StorageError::Misconfigured("memory store lock poisoned".to_string()))?
            .insert(public_id.clone(), image);

        Ok(StoredImage { url, public_id })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str, size: usize) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: vec![7; size],
        }
    }

    #[test]
    fn validate_image_checks_size_and_type() {
        assert!(validate_image(&png("a.png", 10), 10).is_ok());
        assert!(matches!(
            validate_image(&png("a.png", 11), 10),
            Err(StorageError::Rejected { .. })
        ));
        assert!(validate_image(&png("a.png", 0), 10).is_err());

        let pdf = ImageUpload {
            content_type: Some("application/pdf".to_string()),
            ..png("receipt.pdf", 5)
        };
        let err = validate_image(&pdf, 10).unwrap_err();
        assert_eq!(
            err.to_string(),
            "receipt.pdf: content type application/pdf is not an image"
        );
    }

    #[tokio::test]
    async fn memory_store_keeps_uploads() {
        let store = MemoryImageStore::new(1024);

        let stored = store.upload("hotel/rooms/", png("front.png", 3)).await.unwrap();

        assert!(stored.public_id.starts_with("hotel/rooms/"));
        assert!(stored.url.starts_with("memory://hotel/rooms/"));
        assert!(stored.url.ends_with("/front.png"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&stored.public_id).unwrap().bytes, vec![7; 3]);
    }

    #[tokio::test]
    async fn memory_store_rejects_oversized_files() {
        let store = MemoryImageStore::new(2);
        assert!(store.upload("hotel", png("big.png", 3)).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn upload_all_turns_failures_into_warnings() {
        let store = MemoryImageStore::new(4);
        let text = ImageUpload {
            content_type: Some("text/plain".to_string()),
            ..png("notes.txt", 2)
        };

        let report = upload_all(
            &store,
            "hotel/proofs",
            vec![png("ok.png", 2), text, png("huge.png", 5)],
        )
        .await;

        assert_eq!(report.urls.len(), 1);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].starts_with("Failed to upload notes.txt"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn from_config_selects_provider() {
        let store = from_config(&StorageConfig::default()).unwrap();
        assert_eq!(store.name(), "memory");
    }
}
