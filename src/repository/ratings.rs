use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::errors::AppError;
use crate::models::messages;
use crate::models::rating::{validate_rate, Rating};
use crate::models::user::{User, UserRole};
use crate::repository::on_unique_violation;

const RATING_SELECT: &str = "SELECT id, rate, created_at, foto_id, user_id FROM ratings";

/// One vote per user and foto, never on one's own foto
pub async fn create_rate(
    pool: &SqlitePool,
    foto_id: i64,
    rate: i64,
    user: &User,
) -> Result<Rating, AppError> {
    validate_rate(rate)?;

    let owner: Option<i64> = sqlx::query_scalar("SELECT user_id FROM fotos WHERE id = ?")
        .bind(foto_id)
        .fetch_optional(pool)
        .await?;

    match owner {
        None => return Err(AppError::not_found(messages::NO_FOTO_ID)),
        Some(owner) if owner == user.id => return Err(AppError::locked(messages::OWN_FOTO)),
        Some(_) => {}
    }

    if user_rate_foto(pool, user.id, foto_id).await?.is_some() {
        return Err(AppError::locked(messages::VOTE_TWICE));
    }

    // A concurrent vote can slip past the check above; the unique index decides
    let id = sqlx::query("INSERT INTO ratings (rate, created_at, foto_id, user_id) VALUES (?, ?, ?, ?)")
        .bind(rate)
        .bind(Utc::now())
        .bind(foto_id)
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(|e| on_unique_violation(e, || AppError::locked(messages::VOTE_TWICE)))?
        .last_insert_rowid();

    tracing::debug!("User {} rated foto {} with {}", user.id, foto_id, rate);
    get_rating(pool, id)
        .await?
        .ok_or_else(|| AppError::internal_error("Inserted rating vanished"))
}

/// Admins and moderators may edit any rating, users only their own
pub async fn edit_rate(
    pool: &SqlitePool,
    rate_id: i64,
    new_rate: i64,
    user: &User,
) -> Result<Rating, AppError> {
    validate_rate(new_rate)?;

    let rating = get_rating(pool, rate_id)
        .await?
        .ok_or_else(|| AppError::not_found(messages::NO_RATING))?;

    let privileged = matches!(user.role, UserRole::Admin | UserRole::Moderator);
    if !privileged && rating.user_id != user.id {
        return Err(AppError::forbidden(messages::OPERATION_FORBIDDEN));
    }

    sqlx::query("UPDATE ratings SET rate = ? WHERE id = ?")
        .bind(new_rate)
        .bind(rate_id)
        .execute(pool)
        .await?;

    get_rating(pool, rate_id)
        .await?
        .ok_or_else(|| AppError::not_found(messages::NO_RATING))
}

pub async fn delete_rate(pool: &SqlitePool, rate_id: i64) -> Result<Option<Rating>, AppError> {
    let Some(rating) = get_rating(pool, rate_id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM ratings WHERE id = ?")
        .bind(rate_id)
        .execute(pool)
        .await?;

    Ok(Some(rating))
}

pub async fn get_rating(pool: &SqlitePool, rate_id: i64) -> Result<Option<Rating>, AppError> {
    let rating = sqlx::query_as::<_, Rating>(&format!("{RATING_SELECT} WHERE id = ?"))
        .bind(rate_id)
        .fetch_optional(pool)
        .await?;
    Ok(rating)
}

pub async fn show_ratings(pool: &SqlitePool) -> Result<Vec<Rating>, AppError> {
    let ratings = sqlx::query_as::<_, Rating>(&format!("{RATING_SELECT} ORDER BY id"))
        .fetch_all(pool)
        .await?;
    Ok(ratings)
}

pub async fn show_my_ratings(pool: &SqlitePool, user_id: i64) -> Result<Vec<Rating>, AppError> {
    let ratings = sqlx::query_as::<_, Rating>(&format!("{RATING_SELECT} WHERE user_id = ? ORDER BY id"))
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(ratings)
}

pub async fn user_rate_foto(
    pool: &SqlitePool,
    user_id: i64,
    foto_id: i64,
) -> Result<Option<Rating>, AppError> {
    let rating = sqlx::query_as::<_, Rating>(&format!(
        "{RATING_SELECT} WHERE user_id = ? AND foto_id = ?"
    ))
    .bind(user_id)
    .bind(foto_id)
    .fetch_optional(pool)
    .await?;
    Ok(rating)
}
