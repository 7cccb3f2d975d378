use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use super::comments;
use super::like_pattern;
use crate::models::comment::Comment;
use crate::models::errors::AppError;
use crate::models::foto::{parse_tags, Foto, FotoUpdate, MAX_TAGS};
use crate::models::messages;
use crate::models::tag::TagBase;
use crate::models::transform::TransformChain;
use crate::models::user::User;
use crate::services::media_storage::MediaStorage;

/// Foto columns plus the average rating, aliased `f`
pub const FOTO_SELECT: &str = "SELECT f.id, f.image_url, f.transform_url, f.title, f.descr, \
     f.created_at, f.updated_at, f.done, f.user_id, f.public_id, \
     (SELECT AVG(r.rate) FROM ratings r WHERE r.foto_id = f.id) AS avg_rating \
     FROM fotos f";

/// Fills in the tag titles of each foto
pub async fn with_tags(pool: &SqlitePool, mut fotos: Vec<Foto>) -> Result<Vec<Foto>, AppError> {
    for foto in &mut fotos {
        foto.tags = sqlx::query_as::<_, TagBase>(
            "SELECT t.title FROM tags t JOIN foto_tags ft ON ft.tag_id = t.id \
             WHERE ft.foto_id = ? ORDER BY t.id",
        )
        .bind(foto.id)
        .fetch_all(pool)
        .await?;
    }
    Ok(fotos)
}

async fn with_tags_one(pool: &SqlitePool, foto: Option<Foto>) -> Result<Option<Foto>, AppError> {
    match foto {
        Some(foto) => Ok(with_tags(pool, vec![foto]).await?.pop()),
        None => Ok(None),
    }
}

/// Resolves tag titles to ids, creating missing tags owned by `user_id`
pub async fn get_or_create_tags(
    conn: &mut SqliteConnection,
    titles: &[String],
    user_id: i64,
) -> Result<Vec<i64>, AppError> {
    let mut ids = Vec::with_capacity(titles.len());

    for title in titles {
        sqlx::query(
            "INSERT INTO tags (title, created_at, user_id) VALUES (?, ?, ?) \
             ON CONFLICT(title) DO NOTHING",
        )
        .bind(title)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM tags WHERE title = ?")
            .bind(title)
            .fetch_one(&mut *conn)
            .await?;
        ids.push(id);
    }

    Ok(ids)
}

async fn link_tags(conn: &mut SqliteConnection, foto_id: i64, tag_ids: &[i64]) -> Result<(), AppError> {
    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO foto_tags (foto_id, tag_id) VALUES (?, ?)")
            .bind(foto_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn checked_tags(raw: &[String]) -> Result<Vec<String>, AppError> {
    let tags = parse_tags(raw);
    if tags.len() > MAX_TAGS {
        return Err(AppError::validation_failed(messages::TOO_MANY_TAGS));
    }
    Ok(tags)
}

/// Stores the upload and inserts the foto with its tags
pub async fn create_foto(
    pool: &SqlitePool,
    storage: &MediaStorage,
    user: &User,
    meta: &FotoUpdate,
    data: &[u8],
) -> Result<Foto, AppError> {
    meta.validate()?;
    let tags = checked_tags(&meta.tags)?;

    let public_id = MediaStorage::foto_public_id(user.id);
    storage.store(&public_id, data).await?;
    let url = storage.url(&public_id, &TransformChain::preview());

    let inserted = insert_foto(pool, user.id, meta, &tags, &public_id, &url).await;
    let id = match inserted {
        Ok(id) => id,
        Err(e) => {
            if let Err(cleanup) = storage.delete(&public_id).await {
                tracing::warn!("Failed to remove orphaned media {}: {}", public_id, cleanup);
            }
            return Err(e);
        }
    };

    tracing::info!("User {} uploaded foto {} ({})", user.id, id, public_id);
    find_foto(pool, id)
        .await?
        .ok_or_else(|| AppError::internal_error("Inserted foto vanished"))
}

async fn insert_foto(
    pool: &SqlitePool,
    user_id: i64,
    meta: &FotoUpdate,
    tags: &[String],
    public_id: &str,
    url: &str,
) -> Result<i64, AppError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let id = sqlx::query(
        "INSERT INTO fotos (image_url, transform_url, title, descr, created_at, updated_at, done, user_id, public_id) \
         VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(url)
    .bind(url)
    .bind(&meta.title)
    .bind(&meta.descr)
    .bind(now)
    .bind(now)
    .bind(user_id)
    .bind(public_id)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let tag_ids = get_or_create_tags(&mut tx, tags, user_id).await?;
    link_tags(&mut tx, id, &tag_ids).await?;

    tx.commit().await?;
    Ok(id)
}

/// Any foto by id, regardless of owner
pub async fn find_foto(pool: &SqlitePool, foto_id: i64) -> Result<Option<Foto>, AppError> {
    let foto = sqlx::query_as::<_, Foto>(&format!("{FOTO_SELECT} WHERE f.id = ?"))
        .bind(foto_id)
        .fetch_optional(pool)
        .await?;
    with_tags_one(pool, foto).await
}

pub async fn get_all_fotos(pool: &SqlitePool, skip: i64, limit: i64) -> Result<Vec<Foto>, AppError> {
    let rows = sqlx::query_as::<_, Foto>(&format!("{FOTO_SELECT} ORDER BY f.id LIMIT ? OFFSET ?"))
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;
    with_tags(pool, rows).await
}

pub async fn get_my_fotos(
    pool: &SqlitePool,
    skip: i64,
    limit: i64,
    user_id: i64,
) -> Result<Vec<Foto>, AppError> {
    let rows = sqlx::query_as::<_, Foto>(&format!(
        "{FOTO_SELECT} WHERE f.user_id = ? ORDER BY f.id LIMIT ? OFFSET ?"
    ))
    .bind(user_id)
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;
    with_tags(pool, rows).await
}

/// Only the owner sees a foto through this lookup
pub async fn get_foto_by_id(
    pool: &SqlitePool,
    foto_id: i64,
    user_id: i64,
) -> Result<Option<Foto>, AppError> {
    let foto = sqlx::query_as::<_, Foto>(&format!("{FOTO_SELECT} WHERE f.id = ? AND f.user_id = ?"))
        .bind(foto_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    with_tags_one(pool, foto).await
}

pub async fn get_fotos_by_title(pool: &SqlitePool, title: &str) -> Result<Vec<Foto>, AppError> {
    let rows = sqlx::query_as::<_, Foto>(&format!(
        "{FOTO_SELECT} WHERE LOWER(f.title) LIKE ? ESCAPE '\\' ORDER BY f.id"
    ))
    .bind(like_pattern(title))
    .fetch_all(pool)
    .await?;
    with_tags(pool, rows).await
}

pub async fn get_fotos_by_user_id(pool: &SqlitePool, user_id: i64) -> Result<Vec<Foto>, AppError> {
    let rows = sqlx::query_as::<_, Foto>(&format!("{FOTO_SELECT} WHERE f.user_id = ? ORDER BY f.id"))
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    with_tags(pool, rows).await
}

/// Fotos of the first user whose username contains `name`
pub async fn get_fotos_by_username(pool: &SqlitePool, name: &str) -> Result<Vec<Foto>, AppError> {
    let rows = sqlx::query_as::<_, Foto>(&format!(
        "{FOTO_SELECT} WHERE f.user_id = (\
            SELECT id FROM users WHERE LOWER(username) LIKE ? ESCAPE '\\' ORDER BY id LIMIT 1\
         ) ORDER BY f.id"
    ))
    .bind(like_pattern(name))
    .fetch_all(pool)
    .await?;
    with_tags(pool, rows).await
}

pub async fn get_fotos_with_tag(pool: &SqlitePool, tag: &str) -> Result<Vec<Foto>, AppError> {
    let rows = sqlx::query_as::<_, Foto>(&format!(
        "{FOTO_SELECT} WHERE f.id IN (\
            SELECT ft.foto_id FROM foto_tags ft JOIN tags t ON t.id = ft.tag_id WHERE t.title = ?\
         ) ORDER BY f.id"
    ))
    .bind(tag)
    .fetch_all(pool)
    .await?;
    with_tags(pool, rows).await
}

pub async fn get_foto_comments(pool: &SqlitePool, foto_id: i64) -> Result<Vec<Comment>, AppError> {
    comments::comments_for_foto(pool, foto_id).await
}

/// Title or description contains `keyword`
pub async fn get_foto_by_keyword(pool: &SqlitePool, keyword: &str) -> Result<Vec<Foto>, AppError> {
    let pattern = like_pattern(keyword);
    let rows = sqlx::query_as::<_, Foto>(&format!(
        "{FOTO_SELECT} WHERE LOWER(f.title) LIKE ? ESCAPE '\\' \
         OR LOWER(f.descr) LIKE ? ESCAPE '\\' ORDER BY f.id"
    ))
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(pool)
    .await?;
    with_tags(pool, rows).await
}

fn ensure_can_modify(foto: &Foto, user: &User) -> Result<(), AppError> {
    if foto.user_id == user.id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden(messages::OPERATION_FORBIDDEN))
    }
}

/// Replaces title, description and tags. `None` when the foto does not exist.
pub async fn update_foto(
    pool: &SqlitePool,
    foto_id: i64,
    body: &FotoUpdate,
    user: &User,
) -> Result<Option<Foto>, AppError> {
    let Some(foto) = find_foto(pool, foto_id).await? else {
        return Ok(None);
    };
    ensure_can_modify(&foto, user)?;
    body.validate()?;
    let tags = checked_tags(&body.tags)?;

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE fotos SET title = ?, descr = ?, updated_at = ?, done = 1 WHERE id = ?")
        .bind(&body.title)
        .bind(&body.descr)
        .bind(Utc::now())
        .bind(foto_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM foto_tags WHERE foto_id = ?")
        .bind(foto_id)
        .execute(&mut *tx)
        .await?;

    let tag_ids = get_or_create_tags(&mut tx, &tags, user.id).await?;
    link_tags(&mut tx, foto_id, &tag_ids).await?;

    tx.commit().await?;

    tracing::info!("Foto {} updated by user {}", foto_id, user.id);
    find_foto(pool, foto_id).await
}

/// Deletes the stored media, then the row. `None` when the foto does not exist.
pub async fn remove_foto(
    pool: &SqlitePool,
    storage: &MediaStorage,
    foto_id: i64,
    user: &User,
) -> Result<Option<Foto>, AppError> {
    let Some(foto) = find_foto(pool, foto_id).await? else {
        return Ok(None);
    };
    ensure_can_modify(&foto, user)?;

    storage.delete(&foto.public_id).await?;

    sqlx::query("DELETE FROM fotos WHERE id = ?")
        .bind(foto_id)
        .execute(pool)
        .await?;

    tracing::info!("Foto {} removed by user {}", foto_id, user.id);
    Ok(Some(foto))
}

pub async fn set_transform_url(pool: &SqlitePool, foto_id: i64, url: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE fotos SET transform_url = ?, updated_at = ? WHERE id = ?")
        .bind(url)
        .bind(Utc::now())
        .bind(foto_id)
        .execute(pool)
        .await?;
    Ok(())
}
