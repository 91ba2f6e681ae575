//! Multipart form parsing shared by the image upload endpoints.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::{ApiError, bad_request, validation_error};
use crate::storage::ImageUpload;

/// Upper bound on image files accepted in one multipart request.
pub const MAX_FILES_PER_REQUEST: usize = 10;

/// Text fields plus the files sent under one field name.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    pub files: Vec<ImageUpload>,
}

impl UploadForm {
    /// Reads the whole form. Files are only accepted under `file_field`;
    /// empty file inputs are skipped.
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| bad_request(&format!("Malformed multipart body: {err}")))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(str::to_string) {
                if name != file_field {
                    return Err(validation_error(
                        "Unexpected file field",
                        serde_json::json!({ name: format!("files must be sent as '{file_field}'") }),
                    ));
                }
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| bad_request(&format!("Failed to read {file_name}: {err}")))?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                if form.files.len() == MAX_FILES_PER_REQUEST {
                    return Err(bad_request(&format!(
                        "At most {MAX_FILES_PER_REQUEST} files per request"
                    )));
                }
                form.files.push(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|err| bad_request(&format!("Failed to read field {name}: {err}")))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Integer amount in cents; blank means absent.
    pub fn amount(&self, name: &str) -> Result<Option<i64>, ApiError> {
        self.text(name)
            .map(|value| {
                value.parse::<i64>().map_err(|_| {
                    validation_error(
                        "Invalid amount",
                        serde_json::json!({ name: "must be a whole number of cents" }),
                    )
                })
            })
            .transpose()
    }
}
