use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::str::FromStr;

use crate::models::errors::AppError;
use crate::models::messages;
use crate::models::transform::TransformChain;
use crate::services::image_transformer::ImageTransformer;
use crate::services::media_storage::{validate_public_id, MediaFormat};
use crate::AppState;

const VERSION_MARKER: &str = "v1/";

/// Splits `{chain}/v1/{public_id}` (or `v1/{public_id}`) into its parts
pub fn split_media_path(path: &str) -> Option<(&str, &str)> {
    let path = path.trim_start_matches('/');
    if let Some(public_id) = path.strip_prefix(VERSION_MARKER) {
        return Some(("", public_id));
    }
    path.find(&format!("/{}", VERSION_MARKER))
        .map(|at| (&path[..at], &path[at + 1 + VERSION_MARKER.len()..]))
}

/// Serves originals as stored and renders transformed variants as PNG
pub async fn serve_media(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (chain_text, public_id) =
        split_media_path(&path).ok_or_else(|| AppError::not_found(messages::NOT_FOUND))?;
    validate_public_id(public_id).map_err(|_| AppError::not_found(messages::NOT_FOUND))?;
    let chain = TransformChain::from_str(chain_text)?;

    if chain.is_empty() {
        let data = state.storage.read(public_id).await?;
        let content_type = MediaFormat::detect(&data)
            .map(|format| format.content_type())
            .unwrap_or("application/octet-stream");
        return Ok(([(header::CONTENT_TYPE, content_type)], data).into_response());
    }

    let cache_key = format!("{}/{}{}", chain, VERSION_MARKER, public_id);
    if let Some(rendered) = state.media_cache.get(&cache_key).await {
        tracing::debug!("Media cache hit for {}", cache_key);
        return Ok(png_response(rendered));
    }

    let original = state.storage.read(public_id).await?;
    let rendered = tokio::task::spawn_blocking(move || ImageTransformer::render(&original, &chain))
        .await
        .map_err(|e| AppError::internal_error(format!("Render task failed: {}", e)))??;

    state.media_cache.insert(cache_key, rendered.clone()).await;
    Ok(png_response(rendered))
}

fn png_response(data: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], data).into_response()
}
