//! Cloudinary signed upload client.
//!
//! `POST {base_url}/v1_1/{cloud_name}/image/upload` as multipart, signed
//! with SHA-256 over the alphabetically sorted parameters followed by the
//! API secret.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;
use zeroize::Zeroizing;

use super::{ImageStore, ImageUpload, StorageError, StoredImage, validate_image};
use crate::config::StorageConfig;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct CloudinaryStore {
    client: reqwest::Client,
    upload_url: Url,
    api_key: String,
    api_secret: Zeroizing<String>,
    max_bytes: usize,
}

impl CloudinaryStore {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let required = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| StorageError::Misconfigured(format!("{key} is not set")))
        };

        let cloud_name = required(&config.cloud_name, "cloud name")?;
        let api_key = required(&config.api_key, "api key")?;
        let api_secret = required(&config.api_secret, "api secret")?;

        // Without a trailing slash `join` would replace the last path segment.
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let upload_url = Url::parse(&base)
            .and_then(|base| base.join(&format!("v1_1/{cloud_name}/image/upload")))
            .map_err(|e| StorageError::Misconfigured(format!("invalid base url: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            upload_url,
            api_key,
            api_secret: Zeroizing::new(api_secret),
            max_bytes: config.max_upload_bytes,
        })
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }
}

/// `key=value` pairs sorted by key and joined with `&`.
fn string_to_sign(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(&self, folder: &str, image: ImageUpload) -> Result<StoredImage, StorageError> {
        validate_image(&image, self.max_bytes)?;

        let mut params = BTreeMap::new();
        params.insert("folder", folder.trim_matches('/').to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.api_secret);

        let file_name = image.file_name.clone();
        let mut part = Part::bytes(image.bytes).file_name(image.file_name);
        if let Some(content_type) = image.content_type.as_deref() {
            part = part.mime_str(content_type).map_err(|e| StorageError::Rejected {
                file_name: file_name.clone(),
                reason: format!("invalid content type: {e}"),
            })?;
        }

        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .client
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            tracing::warn!(status = status.as_u16(), %file_name, "cloudinary upload failed");
            return Err(StorageError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::MalformedResponse(e.to_string()))?;
        let url = body
            .secure_url
            .or(body.url)
            .ok_or_else(|| StorageError::MalformedResponse("missing url".to_string()))?;

        tracing::debug!(public_id = %body.public_id, "uploaded image to cloudinary");
        Ok(StoredImage {
            url,
            public_id: body.public_id,
        })
    }

    fn name(&self) -> &'static str {
        "cloudinary"
    }
}
