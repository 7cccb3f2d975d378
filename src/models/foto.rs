use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::AppError;
use super::messages;
use super::tag::TagBase;

pub const MAX_TAGS: usize = 5;

/// A row of the `fotos` table joined with its average rating
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Foto {
    pub id: i64,
    pub image_url: String,
    pub transform_url: Option<String>,
    pub title: String,
    pub descr: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub done: bool,
    pub user_id: i64,
    pub public_id: String,
    pub avg_rating: Option<f64>,
    #[sqlx(skip)]
    pub tags: Vec<TagBase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FotoResponse {
    pub id: i64,
    pub image_url: String,
    pub transform_url: Option<String>,
    pub title: String,
    pub descr: String,
    pub tags: Vec<TagBase>,
    pub avg_rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Foto> for FotoResponse {
    fn from(foto: Foto) -> Self {
        Self {
            id: foto.id,
            image_url: foto.image_url,
            transform_url: foto.transform_url,
            title: foto.title,
            descr: foto.descr,
            tags: foto.tags,
            avg_rating: foto.avg_rating.unwrap_or(0.0),
            created_at: foto.created_at,
            updated_at: foto.updated_at,
        }
    }
}

/// Metadata sent alongside an upload or a foto update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FotoUpdate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub descr: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FotoUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.chars().count() > 45 {
            return Err(AppError::validation_failed("Title must be at most 45 characters"));
        }
        if self.descr.chars().count() > 450 {
            return Err(AppError::validation_failed(
                "Description must be at most 450 characters",
            ));
        }
        if parse_tags(&self.tags).len() > MAX_TAGS {
            return Err(AppError::validation_failed(messages::TOO_MANY_TAGS));
        }
        Ok(())
    }
}

/// Splits raw tag inputs on commas, trims, drops empties and duplicates.
/// Order of first appearance is kept.
pub fn parse_tags<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for chunk in raw {
        for title in chunk.as_ref().split(',') {
            let title = title.trim();
            if title.is_empty() || tags.iter().any(|t| t == title) {
                continue;
            }
            tags.push(title.chars().take(50).collect());
        }
    }
    tags
}
