use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use super::{found, non_empty};
use crate::models::comment::{Comment, CommentBase};
use crate::models::errors::AppError;
use crate::repository::comments;
use crate::services::auth::CurrentUser;
use crate::services::roles;
use crate::AppState;

pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(foto_id): Path<i64>,
    Json(body): Json<CommentBase>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = comments::create_comment(&state.db, foto_id, &body, &user).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<i64>,
    Json(body): Json<CommentBase>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(comments::edit_comment(&state.db, comment_id, &body, &user).await?))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<i64>,
) -> Result<Json<Comment>, AppError> {
    roles::ADMIN_MODERATOR.check(&user)?;
    let comment = found(comments::delete_comment(&state.db, comment_id).await?)?;
    tracing::info!("Comment {} deleted by user {}", comment.id, user.id);
    Ok(Json(comment))
}

pub async fn single_comment(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(comment_id): Path<i64>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(found(comments::show_single_comment(&state.db, comment_id).await?)?))
}

pub async fn by_author(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, AppError> {
    roles::ADMIN_MODERATOR.check(&user)?;
    Ok(Json(non_empty(comments::show_user_comments(&state.db, user_id).await?)?))
}

pub async fn foto_by_author(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((user_id, foto_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<Comment>>, AppError> {
    roles::ADMIN_MODERATOR.check(&user)?;
    let comments = comments::show_user_foto_comments(&state.db, user_id, foto_id).await?;
    Ok(Json(non_empty(comments)?))
}
