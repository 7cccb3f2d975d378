use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::header,
};
use futures_util::TryStreamExt;
use multer::{Constraints, Field, Multipart, SizeLimit};
use std::collections::HashMap;

use crate::models::errors::AppError;
use crate::services::media_storage::MediaFormat;

const MAX_TEXT_FIELD_SIZE: usize = 64 * 1024;
/// Room for boundaries, headers and text fields on top of one file
const FORM_OVERHEAD: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Text fields (repeatable) and file fields of a multipart form
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn texts(&self, name: &str) -> Vec<String> {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// Files with no content count as absent
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).filter(|file| !file.data.is_empty())
    }
}

/// Reads the whole multipart body. Fields are consumed chunk by chunk and the
/// read stops at the first byte past `max_file_size` (files) or 64 KiB (text).
pub async fn read_multipart(
    request: Request<Body>,
    max_file_size: usize,
) -> Result<MultipartForm, AppError> {
    let boundary = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| AppError::bad_request("Missing or invalid multipart boundary"))?;

    let stream = request
        .into_body()
        .into_data_stream()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err));

    let constraints = Constraints::new().size_limit(
        SizeLimit::new()
            .whole_stream(max_file_size as u64 + FORM_OVERHEAD)
            .per_field(max_file_size.max(MAX_TEXT_FIELD_SIZE) as u64),
    );
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        let name = field.name().unwrap_or("unknown").to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|m| m.to_string());

        if filename.is_some() {
            let data = Bytes::from(read_limited(field, max_file_size).await?);

            tracing::debug!(
                "Received file field {} ({:?}, {} bytes)",
                name,
                filename,
                data.len()
            );
            form.files.insert(
                name,
                UploadedFile {
                    filename,
                    content_type,
                    data,
                },
            );
        } else {
            let raw = read_limited(field, MAX_TEXT_FIELD_SIZE).await?;
            let value = String::from_utf8(raw)
                .map_err(|_| AppError::bad_request(format!("Field {} is not valid UTF-8", name)))?;
            form.fields.entry(name).or_default().push(value);
        }
    }

    Ok(form)
}

async fn read_limited(mut field: Field<'_>, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let size = data.len() + chunk.len();
        if size > limit {
            return Err(AppError::PayloadTooLarge {
                size,
                max_size: limit,
            });
        }
        data.extend_from_slice(&chunk);
    }

    Ok(data)
}

fn multipart_error(error: multer::Error, max_size: usize) -> AppError {
    match error {
        // multer stops at the first byte past its limit
        multer::Error::FieldSizeExceeded { limit, .. }
        | multer::Error::StreamSizeExceeded { limit } => AppError::PayloadTooLarge {
            size: limit.saturating_add(1) as usize,
            max_size,
        },
        other => {
            tracing::debug!("Failed to read multipart data: {}", other);
            AppError::bad_request(format!("Invalid multipart data: {}", other))
        }
    }
}

/// Magic bytes decide; the declared content type is only logged
pub fn validate_image(file: &UploadedFile) -> Result<MediaFormat, AppError> {
    match MediaFormat::detect(&file.data) {
        Some(format) => Ok(format),
        None => {
            tracing::debug!(
                "Rejected upload {:?} declared as {:?}",
                file.filename,
                file.content_type
            );
            Err(AppError::unsupported_media(
                "Only PNG, JPEG, GIF and WebP images are supported",
            ))
        }
    }
}
