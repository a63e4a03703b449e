//! Uploaded media validation and persistence.

use std::sync::Arc;

use bytes::Bytes;
use club_common::{
    AppError, AppResult, MediaCategory, StorageBackend, generate_storage_key,
    storage::file_extension,
};

/// A file received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct Upload {
    /// File name as sent by the client.
    pub file_name: String,
    /// Content type as sent by the client, if any.
    pub content_type: Option<String>,
    /// Raw file contents.
    pub data: Bytes,
}

impl Upload {
    /// Create an upload from its parts.
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            data,
        }
    }
}

/// Media service storing uploads through a [`StorageBackend`].
#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn StorageBackend>,
    max_upload_bytes: usize,
}

impl MediaService {
    /// Create a new media service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, max_upload_bytes: usize) -> Self {
        Self {
            storage,
            max_upload_bytes,
        }
    }

    /// Check an upload against its category.
    ///
    /// Returns the extension and content type the file is stored with.
    pub fn validate(
        &self,
        category: MediaCategory,
        upload: &Upload,
    ) -> AppResult<(String, String)> {
        if upload.data.is_empty() {
            return Err(AppError::Validation(format!(
                "The uploaded file \"{}\" is empty.",
                upload.file_name
            )));
        }
        if upload.data.len() > self.max_upload_bytes {
            return Err(AppError::Validation(format!(
                "The uploaded file \"{}\" is too large (max {} bytes).",
                upload.file_name, self.max_upload_bytes
            )));
        }

        if category.is_image() {
            let format = image::guess_format(&upload.data).map_err(|_| {
                AppError::Validation(format!(
                    "The uploaded file \"{}\" is not a valid image.",
                    upload.file_name
                ))
            })?;
            let extension = format
                .extensions_str()
                .first()
                .copied()
                .unwrap_or("img")
                .to_string();
            Ok((extension, format.to_mime_type().to_string()))
        } else {
            match file_extension(&upload.file_name).as_deref() {
                Some("gpx") => Ok(("gpx".to_string(), "application/gpx+xml".to_string())),
                _ => Err(AppError::Validation(
                    "Only .gpx files are allowed for routes.".to_string(),
                )),
            }
        }
    }

    /// Validate and store an upload, returning its storage key.
    pub async fn store(&self, category: MediaCategory, upload: &Upload) -> AppResult<String> {
        let (extension, content_type) = self.validate(category, upload)?;
        let key = generate_storage_key(category, &format!("upload.{extension}"));

        self.storage.upload(&key, &upload.data, &content_type).await?;

        tracing::debug!(key = %key, size = upload.data.len(), "Stored upload");
        Ok(key)
    }

    /// Remove a stored file. Failures are logged, never returned.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to delete stored file");
        }
    }

    /// Public URL of a stored file.
    #[must_use]
    pub fn url(&self, key: Option<&str>) -> Option<String> {
        key.filter(|k| !k.is_empty())
            .map(|k| self.storage.public_url(k))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use club_common::LocalStorage;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn service(max: usize) -> (MediaService, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("club-media-{}", ulid::Ulid::new()));
        let storage = Arc::new(LocalStorage::new(dir.clone(), "/media".to_string()));
        (MediaService::new(storage, max), dir)
    }

    #[test]
    fn test_validate_image() {
        let (media, _) = service(1024);
        let upload = Upload::new("bike.bin", None, Bytes::from_static(PNG_HEADER));

        let (ext, mime) = media.validate(MediaCategory::BikePhoto, &upload).unwrap();
        assert_eq!(ext, "png");
        assert_eq!(mime, "image/png");
    }

    #[test]
    fn test_validate_rejects_non_image() {
        let (media, _) = service(1024);
        let upload = Upload::new("bike.jpg", None, Bytes::from_static(b"not an image"));

        assert!(matches!(
            media.validate(MediaCategory::Avatar, &upload),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_gpx_extension() {
        let (media, _) = service(1024);
        let gpx = Bytes::from_static(b"<gpx></gpx>");

        let ok = Upload::new("Route.GPX", None, gpx.clone());
        assert!(media.validate(MediaCategory::GpxRoute, &ok).is_ok());

        let bad = Upload::new("route.kml", None, gpx);
        let err = media.validate(MediaCategory::GpxRoute, &bad).unwrap_err();
        assert_eq!(err.to_string(), "Only .gpx files are allowed for routes.");
    }

    #[test]
    fn test_validate_size_limits() {
        let (media, _) = service(4);

        let empty = Upload::new("a.gpx", None, Bytes::new());
        assert!(media.validate(MediaCategory::GpxRoute, &empty).is_err());

        let big = Upload::new("a.gpx", None, Bytes::from_static(b"<gpx/>"));
        assert!(media.validate(MediaCategory::GpxRoute, &big).is_err());
    }

    #[tokio::test]
    async fn test_store_then_remove() {
        let (media, dir) = service(1024);
        let first = media
            .store(
                MediaCategory::RideHeader,
                &Upload::new("a.png", None, Bytes::from_static(PNG_HEADER)),
            )
            .await
            .unwrap();
        assert!(first.starts_with("ride_headers/"));
        assert!(dir.join(&first).exists());

        let second = media
            .store(
                MediaCategory::RideHeader,
                &Upload::new("b.png", None, Bytes::from_static(PNG_HEADER)),
            )
            .await
            .unwrap();
        assert_ne!(first, second);

        media.remove(&first).await;
        assert!(!dir.join(&first).exists());
        assert!(dir.join(&second).exists());
        // Missing files are ignored.
        media.remove(&first).await;
        assert_eq!(
            media.url(Some(&second)).unwrap(),
            format!("/media/{second}")
        );
        assert!(media.url(None).is_none());

        let _ = std::fs::remove_dir_all(dir);
    }
}
