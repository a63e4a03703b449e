//! Item repository.

use std::sync::Arc;

use crate::entities::{Item, item};
use club_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder};

/// Item repository for database operations.
#[derive(Clone)]
pub struct ItemRepository {
    db: Arc<DatabaseConnection>,
}

impl ItemRepository {
    /// Create a new item repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an item by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<item::Model>> {
        Item::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an item by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<item::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item not found: {id}")))
    }

    /// All items, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<item::Model>> {
        Item::find()
            .order_by_desc(item::Column::CreatedAt)
            .order_by_desc(item::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create an item.
    pub async fn create(&self, model: item::ActiveModel) -> AppResult<item::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an item.
    pub async fn update(&self, model: item::ActiveModel) -> AppResult<item::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an item.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Item::delete_by_id(id)
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
    async fn test_find_all() {
        let now = Utc::now();
        let items = vec![item::Model {
            id: "i1".to_string(),
            name: "Tyre pressure gauge".to_string(),
            description: String::new(),
            created_at: now.into(),
            updated_at: now.into(),
        }];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([items])
                .into_connection(),
        );

        let repo = ItemRepository::new(db);
        let result = repo.find_all().await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Tyre pressure gauge");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<item::Model>::new()])
                .into_connection(),
        );

        let repo = ItemRepository::new(db);
        let err = repo.get_by_id("i9").await.unwrap_err();
        assert_eq!(err.to_string(), "Item not found: i9");
    }
}
