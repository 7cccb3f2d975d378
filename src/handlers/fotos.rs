use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    response::Json,
};

use super::multipart::{read_multipart, validate_image};
use super::{found, non_empty, Pagination};
use crate::models::comment::Comment;
use crate::models::errors::AppError;
use crate::models::foto::{Foto, FotoResponse, FotoUpdate};
use crate::repository::fotos;
use crate::services::auth::CurrentUser;
use crate::services::roles;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 100;

fn respond(fotos: Vec<Foto>) -> Json<Vec<FotoResponse>> {
    Json(fotos.into_iter().map(FotoResponse::from).collect())
}

/// Multipart upload: `file` plus optional `title`, `descr` and repeated `tags`
pub async fn create_foto(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Request,
) -> Result<(StatusCode, Json<FotoResponse>), AppError> {
    let form = read_multipart(request, state.config.max_file_size).await?;

    let file = form
        .file("file")
        .ok_or_else(|| AppError::validation_failed("Field 'file' is required"))?;
    validate_image(file)?;

    let meta = FotoUpdate {
        title: form.text("title").unwrap_or_default().to_string(),
        descr: form.text("descr").unwrap_or_default().to_string(),
        tags: form.texts("tags"),
    };

    let foto = fotos::create_foto(&state.db, &state.storage, &user, &meta, &file.data).await?;
    Ok((StatusCode::CREATED, Json(foto.into())))
}

pub async fn my_fotos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<FotoResponse>>, AppError> {
    let (skip, limit) = page.resolve(DEFAULT_LIMIT);
    let fotos = fotos::get_my_fotos(&state.db, skip, limit, user.id).await?;
    Ok(respond(fotos))
}

pub async fn all_fotos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<FotoResponse>>, AppError> {
    roles::ADMIN.check(&user)?;
    let (skip, limit) = page.resolve(DEFAULT_LIMIT);
    let fotos = fotos::get_all_fotos(&state.db, skip, limit).await?;
    Ok(respond(fotos))
}

pub async fn by_id(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(foto_id): Path<i64>,
) -> Result<Json<FotoResponse>, AppError> {
    let foto = found(fotos::get_foto_by_id(&state.db, foto_id, user.id).await?)?;
    Ok(Json(foto.into()))
}

pub async fn by_title(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(title): Path<String>,
) -> Result<Json<Vec<FotoResponse>>, AppError> {
    let fotos = non_empty(fotos::get_fotos_by_title(&state.db, &title).await?)?;
    Ok(respond(fotos))
}

pub async fn by_user_id(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<FotoResponse>>, AppError> {
    let fotos = non_empty(fotos::get_fotos_by_user_id(&state.db, user_id).await?)?;
    Ok(respond(fotos))
}

pub async fn by_username(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(name): Path<String>,
) -> Result<Json<Vec<FotoResponse>>, AppError> {
    let fotos = non_empty(fotos::get_fotos_by_username(&state.db, &name).await?)?;
    Ok(respond(fotos))
}

pub async fn with_tag(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(tag): Path<String>,
) -> Result<Json<Vec<FotoResponse>>, AppError> {
    let fotos = non_empty(fotos::get_fotos_with_tag(&state.db, &tag).await?)?;
    Ok(respond(fotos))
}

pub async fn comments(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(foto_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let comments = non_empty(fotos::get_foto_comments(&state.db, foto_id).await?)?;
    Ok(Json(comments))
}

pub async fn by_keyword(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(keyword): Path<String>,
) -> Result<Json<Vec<FotoResponse>>, AppError> {
    let fotos = non_empty(fotos::get_foto_by_keyword(&state.db, &keyword).await?)?;
    Ok(respond(fotos))
}

pub async fn update_foto(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(foto_id): Path<i64>,
    Json(body): Json<FotoUpdate>,
) -> Result<Json<FotoResponse>, AppError> {
    let foto = found(fotos::update_foto(&state.db, foto_id, &body, &user).await?)?;
    Ok(Json(foto.into()))
}

pub async fn remove_foto(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(foto_id): Path<i64>,
) -> Result<Json<FotoResponse>, AppError> {
    let foto = found(fotos::remove_foto(&state.db, &state.storage, foto_id, &user).await?)?;
    state.forget_media(&foto.public_id).await;
    Ok(Json(foto.into()))
}
