use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Form,
};

use super::MessageResponse;
use crate::models::errors::AppError;
use crate::models::messages;
use crate::models::user::{LoginForm, RequestEmail, TokenModel, UserModel, UserResponse};
use crate::repository::users;
use crate::services::auth::{BearerToken, CurrentUser};
use crate::AppState;

/// Registers an account and mails the confirmation link in the background
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<UserModel>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    body.validate()?;

    if users::get_user_by_email(&state.db, &body.email).await?.is_some() {
        return Err(AppError::conflict(messages::ALREADY_EXISTS));
    }

    let hash = state.auth.hash_password(&body.password)?;
    let user = users::create_user(&state.db, &body, &hash).await?;

    state
        .email
        .spawn_confirmation(user.email.clone(), user.username.clone(), state.base_url());

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user: user.into(),
            detail: messages::SUCCESS_CREATE_USER.to_string(),
        }),
    ))
}

/// OAuth2 password flow: the `username` field carries the e-mail
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenModel>, AppError> {
    let user = users::get_user_by_email(&state.db, &form.username)
        .await?
        .ok_or_else(|| AppError::unauthorized(messages::INVALID_EMAIL))?;

    if !user.is_verify {
        return Err(AppError::unauthorized(messages::EMAIL_NOT_CONFIRMED));
    }
    if !user.is_active {
        return Err(AppError::forbidden(messages::USER_NOT_ACTIVE));
    }
    if !state.auth.verify_password(&form.password, &user.password) {
        return Err(AppError::unauthorized(messages::INVALID_PASSWORD));
    }

    let access_token = state
        .auth
        .create_access_token(&user.email, Some(state.config.login_access_token_ttl_seconds))?;
    let refresh_token = state.auth.create_refresh_token(&user.email)?;

    users::update_token(&state.db, user.id, Some(&refresh_token)).await?;
    state.forget_user(&user.email).await;

    tracing::info!("User {} logged in", user.id);
    Ok(Json(TokenModel::bearer(access_token, refresh_token)))
}

pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    BearerToken(token): BearerToken,
) -> Result<Json<MessageResponse>, AppError> {
    users::add_to_blacklist(&state.db, &token).await?;
    tracing::info!("User {} logged out", user.id);
    Ok(Json(MessageResponse::new(messages::USER_IS_LOGOUT)))
}

/// Swaps a stored refresh token for a new pair. A mismatch revokes the stored one.
pub async fn refresh_token(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<TokenModel>, AppError> {
    let email = state.auth.decode_refresh_token(&token)?;
    let user = users::get_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::unauthorized(messages::NOT_VALIDATE_CREDENTIALS))?;

    if user.refresh_token.as_deref() != Some(token.as_str()) {
        users::update_token(&state.db, user.id, None).await?;
        state.forget_user(&user.email).await;
        tracing::warn!("Refresh token mismatch for user {}, token revoked", user.id);
        return Err(AppError::unauthorized(messages::INVALID_TOKEN));
    }

    let access_token = state.auth.create_access_token(&email, None)?;
    let refresh_token = state.auth.create_refresh_token(&email)?;

    users::update_token(&state.db, user.id, Some(&refresh_token)).await?;
    state.forget_user(&user.email).await;

    Ok(Json(TokenModel::bearer(access_token, refresh_token)))
}

pub async fn confirmed_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = state.auth.email_from_token(&token)?;
    let user = users::get_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::bad_request(messages::VERIFICATION_ERROR))?;

    if user.is_verify {
        return Ok(Json(MessageResponse::new(messages::EMAIL_ALREADY_CONFIRMED)));
    }

    users::confirmed_email(&state.db, &email).await?;
    state.forget_user(&email).await;

    tracing::info!("User {} confirmed their email", user.id);
    Ok(Json(MessageResponse::new(messages::EMAIL_CONFIRMED)))
}

/// Resends the confirmation mail. Unknown addresses get the same answer.
pub async fn request_email(
    State(state): State<AppState>,
    Json(body): Json<RequestEmail>,
) -> Result<Json<MessageResponse>, AppError> {
    match users::get_user_by_email(&state.db, &body.email).await? {
        Some(user) if user.is_verify => {
            Ok(Json(MessageResponse::new(messages::EMAIL_ALREADY_CONFIRMED)))
        }
        Some(user) => {
            state
                .email
                .spawn_confirmation(user.email, user.username, state.base_url());
            Ok(Json(MessageResponse::new(messages::CHECK_YOUR_EMAIL)))
        }
        None => {
            tracing::debug!("Confirmation requested for unknown address");
            Ok(Json(MessageResponse::new(messages::CHECK_YOUR_EMAIL)))
        }
    }
}
