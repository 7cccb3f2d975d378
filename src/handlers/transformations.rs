use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::models::errors::AppError;
use crate::models::foto::FotoResponse;
use crate::models::transform::TransformBody;
use crate::services::auth::CurrentUser;
use crate::services::transformations;
use crate::AppState;

pub async fn transform_foto(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(foto_id): Path<i64>,
    Json(body): Json<TransformBody>,
) -> Result<Json<FotoResponse>, AppError> {
    let foto =
        transformations::transform_foto(&state.db, &state.storage, foto_id, &body, &user).await?;
    Ok(Json(foto.into()))
}

/// Base64-encoded PNG, returned as a bare JSON string
pub async fn foto_qr(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(foto_id): Path<i64>,
) -> Result<Json<String>, AppError> {
    Ok(Json(transformations::foto_qr(&state.db, foto_id, &user).await?))
}
