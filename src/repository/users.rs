use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::fotos::{self, FOTO_SELECT};
use super::{like_pattern, on_unique_violation};
use crate::models::errors::AppError;
use crate::models::foto::Foto;
use crate::models::messages;
use crate::models::user::{User, UserModel, UserProfileModel, UserRole};

const USER_SELECT: &str = "SELECT id, username, email, password, avatar, created_at, role, \
                           refresh_token, is_active, is_verify FROM users";

pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Inserts a new account; the very first account becomes an administrator
pub async fn create_user(
    pool: &SqlitePool,
    body: &UserModel,
    password_hash: &str,
) -> Result<User, AppError> {
    let mut tx = pool.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *tx)
        .await?;
    let role = if existing == 0 {
        UserRole::Admin
    } else {
        UserRole::User
    };

    let id = sqlx::query(
        "INSERT INTO users (username, email, password, avatar, created_at, role, is_active, is_verify) \
         VALUES (?, ?, ?, ?, ?, ?, 1, 0)",
    )
    .bind(&body.username)
    .bind(&body.email)
    .bind(password_hash)
    .bind(&body.avatar)
    .bind(Utc::now())
    .bind(role)
    .execute(&mut *tx)
    .await
    .map_err(|e| on_unique_violation(e, || AppError::conflict(messages::ALREADY_EXISTS)))?
    .last_insert_rowid();

    tx.commit().await?;

    tracing::info!("Created user {} with role {}", id, role);
    get_user_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::internal_error("Inserted user vanished"))
}

pub async fn update_token(
    pool: &SqlitePool,
    user_id: i64,
    token: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
        .bind(token)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn confirmed_email(pool: &SqlitePool, email: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET is_verify = 1 WHERE email = ?")
        .bind(email)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn ban_user(pool: &SqlitePool, email: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET is_active = 0 WHERE email = ?")
        .bind(email)
        .execute(pool)
        .await?;
    tracing::info!("User {} banned", email);
    Ok(())
}

pub async fn make_user_role(pool: &SqlitePool, email: &str, role: UserRole) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET role = ? WHERE email = ?")
        .bind(role)
        .bind(email)
        .execute(pool)
        .await?;
    tracing::info!("User {} is now {}", email, role);
    Ok(())
}

/// Applies the optional username and avatar URL; returns the fresh row
pub async fn edit_my_profile(
    pool: &SqlitePool,
    user_id: i64,
    new_username: Option<&str>,
    avatar_url: Option<&str>,
) -> Result<User, AppError> {
    sqlx::query(
        "UPDATE users SET username = COALESCE(?, username), avatar = COALESCE(?, avatar) \
         WHERE id = ?",
    )
    .bind(new_username)
    .bind(avatar_url)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(crate::models::messages::NOT_FOUND))
}

pub async fn get_users(pool: &SqlitePool, skip: i64, limit: i64) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(&format!("{USER_SELECT} ORDER BY id LIMIT ? OFFSET ?"))
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;
    Ok(users)
}

/// Case-insensitive substring match on the username
pub async fn get_users_with_username(pool: &SqlitePool, text: &str) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(&format!(
        "{USER_SELECT} WHERE LOWER(username) LIKE ? ESCAPE '\\' ORDER BY id"
    ))
    .bind(like_pattern(text))
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn get_user_profile(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<UserProfileModel>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE username = ? ORDER BY id"))
        .bind(username)
        .fetch_optional(pool)
        .await?;

    let Some(user) = user else {
        return Ok(None);
    };

    let (foto_count, comment_count, rates_count): (i64, i64, i64) = sqlx::query_as(
        "SELECT \
            (SELECT COUNT(*) FROM fotos WHERE user_id = ?), \
            (SELECT COUNT(*) FROM comments WHERE user_id = ?), \
            (SELECT COUNT(*) FROM ratings WHERE user_id = ?)",
    )
    .bind(user.id)
    .bind(user.id)
    .bind(user.id)
    .fetch_one(pool)
    .await?;

    Ok(Some(UserProfileModel {
        username: user.username,
        email: user.email,
        avatar: user.avatar,
        foto_count,
        comment_count,
        rates_count,
        is_active: user.is_active,
        created_at: user.created_at,
    }))
}

pub async fn get_all_commented_fotos(pool: &SqlitePool, user_id: i64) -> Result<Vec<Foto>, AppError> {
    let rows = sqlx::query_as::<_, Foto>(&format!(
        "{FOTO_SELECT} WHERE f.id IN (SELECT foto_id FROM comments WHERE user_id = ?) ORDER BY f.id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    fotos::with_tags(pool, rows).await
}

pub async fn get_all_liked_fotos(pool: &SqlitePool, user_id: i64) -> Result<Vec<Foto>, AppError> {
    let rows = sqlx::query_as::<_, Foto>(&format!(
        "{FOTO_SELECT} WHERE f.id IN (SELECT foto_id FROM ratings WHERE user_id = ?) ORDER BY f.id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    fotos::with_tags(pool, rows).await
}

pub async fn add_to_blacklist(pool: &SqlitePool, token: &str) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO blacklist_tokens (token, blacklisted_on) VALUES (?, ?) \
         ON CONFLICT(token) DO NOTHING",
    )
    .bind(token)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_blacklisted_token(pool: &SqlitePool, token: &str) -> Result<bool, AppError> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM blacklist_tokens WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn remove_from_blacklist(pool: &SqlitePool, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM blacklist_tokens WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Drops entries blacklisted before `older_than`; returns how many went
pub async fn purge_blacklist(pool: &SqlitePool, older_than: DateTime<Utc>) -> Result<u64, AppError> {
    let result =
        sqlx::query("DELETE FROM blacklist_tokens WHERE julianday(blacklisted_on) < julianday(?)")
            .bind(older_than)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}
