use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::comment::{Comment, CommentBase};
use crate::models::errors::AppError;
use crate::models::messages;
use crate::models::user::User;

const COMMENT_SELECT: &str =
    "SELECT id, text, created_at, updated_at, user_id, foto_id, update_status FROM comments";

pub async fn create_comment(
    pool: &SqlitePool,
    foto_id: i64,
    body: &CommentBase,
    user: &User,
) -> Result<Comment, AppError> {
    body.validate()?;

    let foto: Option<i64> = sqlx::query_scalar("SELECT id FROM fotos WHERE id = ?")
        .bind(foto_id)
        .fetch_optional(pool)
        .await?;
    if foto.is_none() {
        return Err(AppError::not_found(messages::NO_FOTO_ID));
    }

    let id = sqlx::query(
        "INSERT INTO comments (text, created_at, user_id, foto_id, update_status) \
         VALUES (?, ?, ?, ?, 0)",
    )
    .bind(&body.text)
    .bind(Utc::now())
    .bind(user.id)
    .bind(foto_id)
    .execute(pool)
    .await?
    .last_insert_rowid();

    show_single_comment(pool, id)
        .await?
        .ok_or_else(|| AppError::internal_error("Inserted comment vanished"))
}

/// Only the author may edit; anything else reads as a missing comment
pub async fn edit_comment(
    pool: &SqlitePool,
    comment_id: i64,
    body: &CommentBase,
    user: &User,
) -> Result<Comment, AppError> {
    body.validate()?;

    let updated = sqlx::query(
        "UPDATE comments SET text = ?, updated_at = ?, update_status = 1 \
         WHERE id = ? AND user_id = ?",
    )
    .bind(&body.text)
    .bind(Utc::now())
    .bind(comment_id)
    .bind(user.id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::not_found(messages::COMM_NOT_FOUND));
    }

    show_single_comment(pool, comment_id)
        .await?
        .ok_or_else(|| AppError::not_found(messages::COMM_NOT_FOUND))
}

pub async fn delete_comment(pool: &SqlitePool, comment_id: i64) -> Result<Option<Comment>, AppError> {
    let Some(comment) = show_single_comment(pool, comment_id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment_id)
        .execute(pool)
        .await?;

    Ok(Some(comment))
}

pub async fn show_single_comment(
    pool: &SqlitePool,
    comment_id: i64,
) -> Result<Option<Comment>, AppError> {
    let comment = sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE id = ?"))
        .bind(comment_id)
        .fetch_optional(pool)
        .await?;
    Ok(comment)
}

pub async fn show_user_comments(pool: &SqlitePool, user_id: i64) -> Result<Vec<Comment>, AppError> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "{COMMENT_SELECT} WHERE user_id = ? ORDER BY id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}

pub async fn show_user_foto_comments(
    pool: &SqlitePool,
    user_id: i64,
    foto_id: i64,
) -> Result<Vec<Comment>, AppError> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "{COMMENT_SELECT} WHERE user_id = ? AND foto_id = ? ORDER BY id"
    ))
    .bind(user_id)
    .bind(foto_id)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}

pub(crate) async fn comments_for_foto(
    pool: &SqlitePool,
    foto_id: i64,
) -> Result<Vec<Comment>, AppError> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "{COMMENT_SELECT} WHERE foto_id = ? ORDER BY id"
    ))
    .bind(foto_id)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}
