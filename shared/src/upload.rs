use actix_multipart::Multipart;
use futures::TryStreamExt;
use image::RgbImage;
use log::warn;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::PipelineError;

/// Multipart field that carries the image.
pub const FILE_FIELD: &str = "file";

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub id: Uuid,
    pub filename: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(filename: Option<String>, content_type: String, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            content_type,
            bytes,
        }
    }

    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }

    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("<unnamed>")
    }
}

/// An upload whose bytes decoded into an RGB raster.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub upload: UploadedImage,
    pub pixels: RgbImage,
}

impl DecodedImage {
    /// CPU bound; run it on the blocking pool from async code.
    pub fn decode(upload: UploadedImage) -> Result<Self, PipelineError> {
        let pixels = image::load_from_memory(&upload.bytes)?.to_rgb8();
        Ok(Self { upload, pixels })
    }
}

pub fn validate_content_type(content_type: Option<&str>) -> Result<&str, PipelineError> {
    match content_type {
        Some(ct) if ct.starts_with("image/") => Ok(ct),
        _ => Err(PipelineError::not_an_image()),
    }
}

/// Pulls the `file` field out of the payload. The declared content type is
/// checked before any of the field's bytes are buffered.
pub async fn read_upload(
    mut payload: Multipart,
    policy: &UploadPolicy,
) -> Result<UploadedImage, PipelineError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| PipelineError::ClientInput(format!("Malformed multipart payload: {}", e)))?
    {
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .map(str::to_owned);
        if name.as_deref() != Some(FILE_FIELD) {
            continue;
        }

        let declared = field.content_type().map(|mime| mime.essence_str().to_owned());
        let content_type = match validate_content_type(declared.as_deref()) {
            Ok(ct) => ct.to_owned(),
            Err(e) => {
                warn!("Rejected upload with content type {:?}", declared);
                return Err(e);
            }
        };
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| PipelineError::ClientInput(format!("Malformed multipart payload: {}", e)))?
        {
            if bytes.len() + chunk.len() > policy.max_bytes {
                return Err(PipelineError::PayloadTooLarge {
                    limit: policy.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(UploadedImage::new(filename, content_type, bytes));
    }

    Err(PipelineError::ClientInput(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}
