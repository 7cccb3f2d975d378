use std::{fs, path::PathBuf};
use tokio::fs as async_fs;

use crate::models::errors::AppError;
use crate::models::transform::TransformChain;

/// Image formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl MediaFormat {
    /// Sniffs the format from magic bytes
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(MediaFormat::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(MediaFormat::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(MediaFormat::Gif)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(MediaFormat::WebP)
        } else {
            None
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            MediaFormat::Png => "image/png",
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Gif => "image/gif",
            MediaFormat::WebP => "image/webp",
        }
    }
}

/// Local image store addressed by public ids, served back through `/media`
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    public_url: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Result<Self, AppError> {
        let root = root.into();

        if !root.exists() {
            fs::create_dir_all(&root).map_err(|e| {
                AppError::storage_failed(format!("Failed to create media directory: {}", e))
            })?;
        }

        Ok(Self {
            root,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn foto_public_id(user_id: i64) -> String {
        format!("photoshake/{}/{}", user_id, uuid::Uuid::new_v4().simple())
    }

    pub fn avatar_public_id(user_id: i64) -> String {
        format!("photoshake/avatars/{}", user_id)
    }

    /// Delivery URL for a public id with an optional transformation chain
    pub fn url(&self, public_id: &str, chain: &TransformChain) -> String {
        if chain.is_empty() {
            format!("{}/media/v1/{}", self.public_url, public_id)
        } else {
            // Caption text may carry characters that end a path in a URL
            let chain = chain.to_string().replace(' ', "%20").replace('?', "%3F");
            format!("{}/media/{}/v1/{}", self.public_url, chain, public_id)
        }
    }

    pub async fn store(&self, public_id: &str, data: &[u8]) -> Result<(), AppError> {
        let path = self.path_for(public_id)?;

        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await.map_err(|e| {
                AppError::storage_failed(format!("Failed to create media directory: {}", e))
            })?;
        }

        async_fs::write(&path, data)
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to write media file: {}", e)))?;

        tracing::debug!("Stored media {} ({} bytes)", public_id, data.len());
        Ok(())
    }

    pub async fn read(&self, public_id: &str) -> Result<Vec<u8>, AppError> {
        let path = self.path_for(public_id)?;

        if !path.is_file() {
            return Err(AppError::not_found(crate::models::messages::NOT_FOUND));
        }

        async_fs::read(&path)
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to read media file: {}", e)))
    }

    /// Deleting a missing object is not an error
    pub async fn delete(&self, public_id: &str) -> Result<(), AppError> {
        let path = self.path_for(public_id)?;

        if path.is_file() {
            async_fs::remove_file(&path).await.map_err(|e| {
                AppError::storage_failed(format!("Failed to delete media file: {}", e))
            })?;
            tracing::debug!("Deleted media {}", public_id);
        }

        Ok(())
    }

    pub fn exists(&self, public_id: &str) -> bool {
        self.path_for(public_id)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn path_for(&self, public_id: &str) -> Result<PathBuf, AppError> {
        validate_public_id(public_id)?;
        Ok(self.root.join(public_id))
    }
}

/// Public ids are `/`-separated segments of `[A-Za-z0-9_-]`
pub fn validate_public_id(public_id: &str) -> Result<(), AppError> {
    let valid = !public_id.is_empty()
        && public_id.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        });

    if !valid {
        return Err(AppError::validation_failed(format!(
            "Invalid media id: {}",
            public_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transform::Transformation;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_read_delete() {
        let dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(dir.path(), "http://localhost:8000/").unwrap();

        storage.store("photoshake/1/abc", b"data").await.unwrap();
        assert!(storage.exists("photoshake/1/abc"));
        assert_eq!(storage.read("photoshake/1/abc").await.unwrap(), b"data");

        storage.delete("photoshake/1/abc").await.unwrap();
        assert!(!storage.exists("photoshake/1/abc"));
        assert!(matches!(
            storage.read("photoshake/1/abc").await,
            Err(AppError::NotFound { .. })
        ));
        storage.delete("photoshake/1/abc").await.unwrap();
    }

    #[test]
    fn test_rejects_path_traversal() {
        assert!(validate_public_id("photoshake/../etc").is_err());
        assert!(validate_public_id("/abs").is_err());
        assert!(validate_public_id("a//b").is_err());
        assert!(validate_public_id("photoshake/avatars/7").is_ok());
    }

    #[test]
    fn test_urls() {
        let dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(dir.path(), "http://host").unwrap();

        assert_eq!(
            storage.url("photoshake/1/x", &TransformChain::default()),
            "http://host/media/v1/photoshake/1/x"
        );
        assert_eq!(
            storage.url("photoshake/1/x", &TransformChain::preview()),
            "http://host/media/c_fill,h_250,w_250/v1/photoshake/1/x"
        );

        let caption = TransformChain(vec![Transformation::Text {
            size: 14,
            text: "Why not?".to_string(),
        }]);
        assert_eq!(
            storage.url("photoshake/1/x", &caption),
            "http://host/media/co_yellow,g_south,l_text:14:Why%20not%3F,y_20/v1/photoshake/1/x"
        );
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(MediaFormat::detect(b"GIF89a......"), Some(MediaFormat::Gif));
        assert_eq!(MediaFormat::detect(b"RIFF\0\0\0\0WEBPVP8 "), Some(MediaFormat::WebP));
        assert_eq!(MediaFormat::detect(b"plain text"), None);
    }
}
