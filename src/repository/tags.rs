use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::errors::AppError;
use crate::models::messages;
use crate::models::tag::{Tag, TagBase};

const TAG_SELECT: &str = "SELECT id, title, user_id, created_at FROM tags";

async fn find_by_title(pool: &SqlitePool, title: &str) -> Result<Option<Tag>, AppError> {
    let tag = sqlx::query_as::<_, Tag>(&format!("{TAG_SELECT} WHERE title = ?"))
        .bind(title)
        .fetch_optional(pool)
        .await?;
    Ok(tag)
}

/// Returns the existing tag when the title is already taken
pub async fn create_tag(pool: &SqlitePool, body: &TagBase, user_id: i64) -> Result<Tag, AppError> {
    body.validate()?;
    let title = body.title.trim();

    if let Some(existing) = find_by_title(pool, title).await? {
        return Ok(existing);
    }

    let id = sqlx::query("INSERT INTO tags (title, created_at, user_id) VALUES (?, ?, ?)")
        .bind(title)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?
        .last_insert_rowid();

    get_tag_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::internal_error("Inserted tag vanished"))
}

pub async fn get_my_tags(
    pool: &SqlitePool,
    skip: i64,
    limit: i64,
    user_id: i64,
) -> Result<Vec<Tag>, AppError> {
    let tags = sqlx::query_as::<_, Tag>(&format!(
        "{TAG_SELECT} WHERE user_id = ? ORDER BY id LIMIT ? OFFSET ?"
    ))
    .bind(user_id)
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;
    Ok(tags)
}

pub async fn get_all_tags(pool: &SqlitePool, skip: i64, limit: i64) -> Result<Vec<Tag>, AppError> {
    let tags = sqlx::query_as::<_, Tag>(&format!("{TAG_SELECT} ORDER BY id LIMIT ? OFFSET ?"))
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;
    Ok(tags)
}

pub async fn get_tag_by_id(pool: &SqlitePool, tag_id: i64) -> Result<Option<Tag>, AppError> {
    let tag = sqlx::query_as::<_, Tag>(&format!("{TAG_SELECT} WHERE id = ?"))
        .bind(tag_id)
        .fetch_optional(pool)
        .await?;
    Ok(tag)
}

/// Renames a tag; another tag with the same title is a conflict
pub async fn update_tag(
    pool: &SqlitePool,
    body: &TagBase,
    tag_id: i64,
) -> Result<Option<Tag>, AppError> {
    body.validate()?;
    let title = body.title.trim();

    if get_tag_by_id(pool, tag_id).await?.is_none() {
        return Ok(None);
    }

    if let Some(existing) = find_by_title(pool, title).await? {
        if existing.id != tag_id {
            return Err(AppError::conflict(messages::TAG_ALREADY_EXISTS));
        }
    }

    sqlx::query("UPDATE tags SET title = ? WHERE id = ?")
        .bind(title)
        .bind(tag_id)
        .execute(pool)
        .await?;

    get_tag_by_id(pool, tag_id).await
}

pub async fn remove_tag(pool: &SqlitePool, tag_id: i64) -> Result<Option<Tag>, AppError> {
    let Some(tag) = get_tag_by_id(pool, tag_id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(tag_id)
        .execute(pool)
        .await?;

    tracing::info!("Tag {} ({}) removed", tag.id, tag.title);
    Ok(Some(tag))
}
