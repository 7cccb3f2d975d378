use sqlx::SqlitePool;

use crate::models::errors::AppError;
use crate::models::foto::Foto;
use crate::models::messages;
use crate::models::transform::TransformBody;
use crate::models::user::User;
use crate::repository::fotos;
use crate::services::media_storage::MediaStorage;
use crate::services::qr;

/// Points the foto's transform URL at the requested chain. Own fotos only.
pub async fn transform_foto(
    pool: &SqlitePool,
    storage: &MediaStorage,
    foto_id: i64,
    body: &TransformBody,
    user: &User,
) -> Result<Foto, AppError> {
    let foto = fotos::get_foto_by_id(pool, foto_id, user.id)
        .await?
        .ok_or_else(|| AppError::not_found(messages::NOT_FOUND))?;

    let chain = body.to_chain()?;
    if chain.is_empty() {
        return Ok(foto);
    }

    let url = storage.url(&foto.public_id, &chain);
    fotos::set_transform_url(pool, foto.id, &url).await?;
    tracing::info!("Foto {} transformed: {}", foto.id, chain);

    fotos::find_foto(pool, foto.id)
        .await?
        .ok_or_else(|| AppError::not_found(messages::NOT_FOUND))
}

/// Base64 PNG of a QR code for the foto's transform URL
pub async fn foto_qr(pool: &SqlitePool, foto_id: i64, user: &User) -> Result<String, AppError> {
    let url = fotos::get_foto_by_id(pool, foto_id, user.id)
        .await?
        .and_then(|foto| foto.transform_url)
        .ok_or_else(|| AppError::not_found(messages::NOT_FOUND))?;

    tokio::task::spawn_blocking(move || qr::qr_png_base64(&url))
        .await
        .map_err(|e| AppError::internal_error(format!("QR task failed: {}", e)))?
}
