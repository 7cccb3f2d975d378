use axum::{
    extract::{Path, Query, State},
    response::Json,
};

use super::{found, Pagination};
use crate::models::errors::AppError;
use crate::models::tag::{Tag, TagBase};
use crate::repository::tags;
use crate::services::auth::CurrentUser;
use crate::services::roles;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 100;

pub async fn create_tag(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<TagBase>,
) -> Result<Json<Tag>, AppError> {
    let tag = tags::create_tag(&state.db, &body, user.id).await?;
    Ok(Json(tag))
}

pub async fn my_tags(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let (skip, limit) = page.resolve(DEFAULT_LIMIT);
    Ok(Json(tags::get_my_tags(&state.db, skip, limit, user.id).await?))
}

pub async fn all_tags(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Tag>>, AppError> {
    roles::ADMIN.check(&user)?;
    let (skip, limit) = page.resolve(DEFAULT_LIMIT);
    Ok(Json(tags::get_all_tags(&state.db, skip, limit).await?))
}

pub async fn by_id(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(tag_id): Path<i64>,
) -> Result<Json<Tag>, AppError> {
    Ok(Json(found(tags::get_tag_by_id(&state.db, tag_id).await?)?))
}

pub async fn update_tag(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tag_id): Path<i64>,
    Json(body): Json<TagBase>,
) -> Result<Json<Tag>, AppError> {
    roles::ADMIN.check(&user)?;
    Ok(Json(found(tags::update_tag(&state.db, &body, tag_id).await?)?))
}

pub async fn remove_tag(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tag_id): Path<i64>,
) -> Result<Json<Tag>, AppError> {
    roles::ADMIN.check(&user)?;
    let tag = found(tags::remove_tag(&state.db, tag_id).await?)?;
    tracing::info!("Tag {} removed by user {}", tag.id, user.id);
    Ok(Json(tag))
}
