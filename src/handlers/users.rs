use axum::{
    extract::{Path, Query, Request, State},
    response::Json,
};

use super::multipart::{read_multipart, validate_image};
use super::{found, non_empty, MessageResponse, Pagination};
use crate::models::errors::AppError;
use crate::models::foto::FotoResponse;
use crate::models::messages;
use crate::models::transform::TransformChain;
use crate::models::user::{
    validate_username, RequestEmail, RequestRole, UserDb, UserProfileModel, UserResponseModel,
};
use crate::repository::users;
use crate::services::auth::CurrentUser;
use crate::services::media_storage::MediaStorage;
use crate::services::roles;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 10;

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserDb> {
    Json(user.into())
}

/// Multipart `avatar` file and optional `new_username`
pub async fn edit_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Request,
) -> Result<Json<UserDb>, AppError> {
    let form = read_multipart(request, state.config.max_file_size).await?;

    let new_username = form
        .text("new_username")
        .map(str::trim)
        .filter(|name| !name.is_empty());
    if let Some(name) = new_username {
        validate_username(name)?;
    }

    let avatar = form.file("avatar");
    if let Some(file) = avatar {
        validate_image(file)?;
    }

    let public_id = MediaStorage::avatar_public_id(user.id);
    let avatar_url = match avatar {
        Some(file) => {
            state.storage.store(&public_id, &file.data).await?;
            state.forget_media(&public_id).await;
            Some(state.storage.url(&public_id, &TransformChain::preview()))
        }
        None => None,
    };

    let updated =
        match users::edit_my_profile(&state.db, user.id, new_username, avatar_url.as_deref()).await
        {
            Ok(updated) => updated,
            Err(e) => {
                // A first avatar has no row to point at it yet
                if avatar_url.is_some() && user.avatar.is_none() {
                    if let Err(cleanup) = state.storage.delete(&public_id).await {
                        tracing::warn!("Failed to remove avatar {}: {}", public_id, cleanup);
                    }
                }
                return Err(e);
            }
        };
    state.forget_user(&user.email).await;

    tracing::info!("User {} edited their profile", user.id);
    Ok(Json(updated.into()))
}

pub async fn all(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<UserDb>>, AppError> {
    roles::ADMIN.check(&user)?;
    let (skip, limit) = page.resolve(DEFAULT_LIMIT);

    let users = users::get_users(&state.db, skip, limit).await?;
    Ok(Json(users.into_iter().map(UserDb::from).collect()))
}

pub async fn users_with_username(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<Vec<UserResponseModel>>, AppError> {
    let users = non_empty(users::get_users_with_username(&state.db, &username).await?)?;
    Ok(Json(users.into_iter().map(UserResponseModel::from).collect()))
}

pub async fn user_profile(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<UserProfileModel>, AppError> {
    let profile = found(users::get_user_profile(&state.db, &username).await?)?;
    Ok(Json(profile))
}

pub async fn commented_fotos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<FotoResponse>>, AppError> {
    let fotos = non_empty(users::get_all_commented_fotos(&state.db, user.id).await?)?;
    Ok(Json(fotos.into_iter().map(FotoResponse::from).collect()))
}

pub async fn rated_fotos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<FotoResponse>>, AppError> {
    let fotos = non_empty(users::get_all_liked_fotos(&state.db, user.id).await?)?;
    Ok(Json(fotos.into_iter().map(FotoResponse::from).collect()))
}

/// The target comes from the JSON body; the path segment is informational
pub async fn ban(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(_email): Path<String>,
    Json(body): Json<RequestEmail>,
) -> Result<Json<MessageResponse>, AppError> {
    roles::ADMIN.check(&admin)?;

    let user = users::get_user_by_email(&state.db, &body.email)
        .await?
        .ok_or_else(|| AppError::unauthorized(messages::INVALID_EMAIL))?;

    if !user.is_active {
        return Err(AppError::conflict(messages::USER_ALREADY_NOT_ACTIVE));
    }

    users::ban_user(&state.db, &user.email).await?;
    state.forget_user(&user.email).await;

    Ok(Json(MessageResponse::new(messages::USER_NOT_ACTIVE)))
}

pub async fn make_role(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(_email): Path<String>,
    Json(body): Json<RequestRole>,
) -> Result<Json<MessageResponse>, AppError> {
    roles::ADMIN.check(&admin)?;

    let user = users::get_user_by_email(&state.db, &body.email)
        .await?
        .ok_or_else(|| AppError::unauthorized(messages::INVALID_EMAIL))?;

    if user.role == body.role {
        return Ok(Json(MessageResponse::new(messages::USER_ROLE_EXISTS)));
    }

    users::make_user_role(&state.db, &user.email, body.role).await?;
    state.forget_user(&user.email).await;

    Ok(Json(MessageResponse::new(format!(
        "{} {}",
        messages::USER_CHANGE_ROLE_TO,
        body.role
    ))))
}
