//! Ride photo and comment repositories.

use std::sync::Arc;

use crate::entities::{RideComment, RidePhoto, ride_comment, ride_photo, user};
use club_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Ride photo repository for database operations.
#[derive(Clone)]
pub struct RidePhotoRepository {
    db: Arc<DatabaseConnection>,
}

impl RidePhotoRepository {
    /// Create a new ride photo repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a photo by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<ride_photo::Model>> {
        RidePhoto::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Photos of a ride in gallery order, with their uploaders.
    pub async fn find_by_ride(
        &self,
        ride_id: &str,
    ) -> AppResult<Vec<(ride_photo::Model, Option<user::Model>)>> {
        RidePhoto::find()
            .find_also_related(user::Entity)
            .filter(ride_photo::Column::RideId.eq(ride_id))
            .order_by_asc(ride_photo::Column::DisplayOrder)
            .order_by_asc(ride_photo::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a photo.
    pub async fn create(&self, model: ride_photo::ActiveModel) -> AppResult<ride_photo::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a photo.
    pub async fn update(&self, model: ride_photo::ActiveModel) -> AppResult<ride_photo::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a photo.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        RidePhoto::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Ride comment repository for database operations.
#[derive(Clone)]
pub struct RideCommentRepository {
    db: Arc<DatabaseConnection>,
}

impl RideCommentRepository {
    /// Create a new ride comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<ride_comment::Model>> {
        RideComment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comments on a ride, oldest first, with their authors.
    pub async fn find_by_ride(
        &self,
        ride_id: &str,
    ) -> AppResult<Vec<(ride_comment::Model, Option<user::Model>)>> {
        RideComment::find()
            .find_also_related(user::Entity)
            .filter(ride_comment::Column::RideId.eq(ride_id))
            .order_by_asc(ride_comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a comment.
    pub async fn create(
        &self,
        model: ride_comment::ActiveModel,
    ) -> AppResult<ride_comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        RideComment::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_photo_by_id() {
        let photo = ride_photo::Model {
            id: "ph1".to_string(),
            ride_id: "r1".to_string(),
            photo: "ride_photos/2025/06/a.jpg".to_string(),
            caption: "Summit".to_string(),
            uploaded_by: "u1".to_string(),
            display_order: 2,
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[photo]])
                .into_connection(),
        );

        let repo = RidePhotoRepository::new(db);
        let found = repo.find_by_id("ph1").await.unwrap().unwrap();

        assert_eq!(found.caption, "Summit");
        assert_eq!(found.display_order, 2);
    }

    #[tokio::test]
    async fn test_find_comment_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<ride_comment::Model>::new()])
                .into_connection(),
        );

        let repo = RideCommentRepository::new(db);
        assert!(repo.find_by_id("c1").await.unwrap().is_none());
    }
}
