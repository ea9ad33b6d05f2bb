//! Image upload handling
//!
//! Reads the `file` field of a multipart body and checks it against the
//! upload configuration before a service stores it.

use axum::extract::Multipart;
use serde::Serialize;

use crate::api::flash::FlashMessage;
use crate::api::middleware::ApiError;
use crate::config::UploadConfig;
use crate::services::file_store::public_url;
use crate::services::Upload;

/// A stored image as listed to the client
#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: i64,
    pub name: Option<String>,
    pub url: Option<String>,
}

impl ImageResponse {
    pub fn new(id: i64, name: Option<String>, namespace: &str) -> Self {
        let url = name.as_deref().map(|n| public_url(namespace, n));
        Self { id, name, url }
    }
}

/// A record together with its images
#[derive(Debug, Serialize)]
pub struct ImagesResponse<P> {
    pub parent: P,
    pub images: Vec<ImageResponse>,
    pub flash: Option<FlashMessage>,
}

/// Take the single `file` field of a multipart upload.
///
/// Other fields are skipped. The content type must be one of
/// `allowed_types` and the body no larger than `max_file_size`.
pub async fn read_image(
    multipart: &mut Multipart,
    config: &UploadConfig,
) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !config.is_type_allowed(&content_type) {
            return Err(ApiError::validation_error(format!(
                "Invalid file type: {}. Allowed types: {:?}",
                content_type, config.allowed_types
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        if data.is_empty() {
            return Err(ApiError::validation_error("Uploaded file is empty"));
        }
        if data.len() as u64 > config.max_file_size {
            return Err(ApiError::with_details(
                "VALIDATION_ERROR",
                format!(
                    "File too large. Maximum size: {} MB",
                    config.max_file_size / 1024 / 1024
                ),
                serde_json::json!({ "max_file_size": config.max_file_size }),
            ));
        }

        return Ok(Upload {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    Err(ApiError::validation_error("No file provided"))
}
