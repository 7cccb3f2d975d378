use axum::{
    extract::{Path, State},
    response::Json,
};

use super::found;
use crate::models::errors::AppError;
use crate::models::rating::Rating;
use crate::repository::ratings;
use crate::services::auth::CurrentUser;
use crate::services::roles;
use crate::AppState;

pub async fn create_rate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((foto_id, rate)): Path<(i64, i64)>,
) -> Result<Json<Rating>, AppError> {
    Ok(Json(ratings::create_rate(&state.db, foto_id, rate, &user).await?))
}

pub async fn edit_rate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((rate_id, new_rate)): Path<(i64, i64)>,
) -> Result<Json<Rating>, AppError> {
    Ok(Json(ratings::edit_rate(&state.db, rate_id, new_rate, &user).await?))
}

pub async fn delete_rate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(rate_id): Path<i64>,
) -> Result<Json<Rating>, AppError> {
    roles::ADMIN_MODERATOR.check(&user)?;
    let rating = found(ratings::delete_rate(&state.db, rate_id).await?)?;
    tracing::info!("Rating {} deleted by user {}", rating.id, user.id);
    Ok(Json(rating))
}

pub async fn all_ratings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Rating>>, AppError> {
    roles::ADMIN_MODERATOR.check(&user)?;
    Ok(Json(ratings::show_ratings(&state.db).await?))
}

pub async fn my_ratings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Rating>>, AppError> {
    Ok(Json(ratings::show_my_ratings(&state.db, user.id).await?))
}

pub async fn user_foto_rating(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((user_id, foto_id)): Path<(i64, i64)>,
) -> Result<Json<Rating>, AppError> {
    roles::ADMIN.check(&user)?;
    Ok(Json(found(ratings::user_rate_foto(&state.db, user_id, foto_id).await?)?))
}
