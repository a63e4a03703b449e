//! Media storage abstraction for uploaded files.
//!
//! Records keep only the storage key; URLs are resolved through the backend
//! at read time so the media location can move without a data migration.

use std::path::PathBuf;

use crate::{AppError, AppResult};

/// What an uploaded file is for. Decides where it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    /// Profile picture.
    Avatar,
    /// One of the three bike photos on a profile.
    BikePhoto,
    /// Header image of a ride.
    RideHeader,
    /// GPX route file of a ride.
    GpxRoute,
    /// Photo in a ride's gallery.
    RidePhoto,
}

impl MediaCategory {
    /// Key prefix files of this category are stored under.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Avatar => "avatars",
            Self::BikePhoto => "bikes",
            Self::RideHeader => "ride_headers",
            Self::GpxRoute => "gpx_files",
            Self::RidePhoto => "ride_photos",
        }
    }

    /// Whether files of this category must be images.
    #[must_use]
    pub const fn is_image(self) -> bool {
        !matches!(self, Self::GpxRoute)
    }
}

/// Uploaded file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (relative path).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile>;

    /// Delete a file. Deleting a missing file is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self { base_path, base_url }
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.split('/').any(|part| part == "..") {
            return Err(AppError::Storage(format!("Invalid storage key: {key}")));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile> {
        let path = self.resolve(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }
}

/// Extract the lowercase extension of an uploaded file name.
#[must_use]
pub fn file_extension(original_name: &str) -> Option<String> {
    original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| original_name[pos + 1..].to_ascii_lowercase())
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Generate a unique storage key for a file.
///
/// Keys look like `ride_headers/2025/05/01hx...q.jpg`.
#[must_use]
pub fn generate_storage_key(category: MediaCategory, original_name: &str) -> String {
    use chrono::Utc;

    let date_path = Utc::now().format("%Y/%m").to_string();
    let extension = file_extension(original_name).unwrap_or_else(|| "bin".to_string());
    let id = ulid::Ulid::new().to_string().to_lowercase();

    format!("{}/{date_path}/{id}.{extension}", category.prefix())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key(MediaCategory::RideHeader, "Sunset.JPG");
        assert!(key.starts_with("ride_headers/"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn test_generate_storage_key_no_extension() {
        let key = generate_storage_key(MediaCategory::Avatar, "file");
        assert!(key.starts_with("avatars/"));
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("route.gpx"), Some("gpx".to_string()));
        assert_eq!(file_extension("route.GPX"), Some("gpx".to_string()));
        assert_eq!(file_extension("route.txt"), Some("txt".to_string()));
        assert_eq!(file_extension(".gpx"), None);
        assert_eq!(file_extension("route."), None);
        assert_eq!(file_extension("route"), None);
    }

    #[test]
    fn test_category_prefixes() {
        assert_eq!(MediaCategory::BikePhoto.prefix(), "bikes");
        assert_eq!(MediaCategory::GpxRoute.prefix(), "gpx_files");
        assert!(!MediaCategory::GpxRoute.is_image());
        assert!(MediaCategory::RidePhoto.is_image());
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let dir = std::env::temp_dir().join(format!("club-storage-{}", ulid::Ulid::new()));
        let storage = LocalStorage::new(dir.clone(), "http://localhost/media/".to_string());

        let uploaded = storage
            .upload("gpx_files/2025/01/a.gpx", b"<gpx/>", "application/gpx+xml")
            .await
            .unwrap();
        assert_eq!(uploaded.url, "http://localhost/media/gpx_files/2025/01/a.gpx");
        assert_eq!(uploaded.size, 6);
        assert!(storage.exists("gpx_files/2025/01/a.gpx").await.unwrap());

        storage.delete("gpx_files/2025/01/a.gpx").await.unwrap();
        assert!(!storage.exists("gpx_files/2025/01/a.gpx").await.unwrap());

        // Deleting twice is fine
        storage.delete("gpx_files/2025/01/a.gpx").await.unwrap();

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_local_storage_rejects_traversal() {
        let storage = LocalStorage::new(PathBuf::from("/tmp/club"), "/media".to_string());
        assert!(storage.upload("../etc/passwd", b"x", "text/plain").await.is_err());
        assert!(storage.delete("/etc/passwd").await.is_err());
    }
}
