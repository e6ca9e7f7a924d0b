//! Reading the post form out of a `multipart/form-data` body.

use actix_multipart::{Field, Multipart};
use futures::TryStreamExt;

use quill_core::forms::{PostSubmission, Upload};

use crate::middleware::error::AppError;

/// Largest accepted text or choice field.
pub const MAX_FIELD_BYTES: usize = 64 * 1024;

/// Largest accepted image upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

async fn read_bytes(mut field: Field, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();

    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if buf.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge(format!(
                "field exceeds {} bytes",
                limit
            )));
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf)
}

async fn read_text(field: Field) -> Result<String, AppError> {
    let bytes = read_bytes(field, MAX_FIELD_BYTES).await?;
    String::from_utf8(bytes).map_err(|_| AppError::BadRequest("field is not valid UTF-8".to_string()))
}

/// Collect `text`, `group` and `image`. An empty file part counts as no
/// image; unknown fields are read and dropped.
pub async fn read_post_submission(mut payload: Multipart) -> Result<PostSubmission, AppError> {
    let mut submission = PostSubmission::default();

    while let Some(field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "text" => submission.text = Some(read_text(field).await?),
            "group" => submission.group = Some(read_text(field).await?),
            "image" => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or_default()
                    .to_string();
                let bytes = read_bytes(field, MAX_UPLOAD_BYTES).await?;

                if !bytes.is_empty() {
                    submission.image = Some(Upload { filename, bytes });
                }
            }
            other => {
                tracing::debug!(field = %other, "Skipping unknown form field");
                read_bytes(field, MAX_UPLOAD_BYTES).await?;
            }
        }
    }

    Ok(submission)
}
