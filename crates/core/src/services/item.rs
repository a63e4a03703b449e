//! Item catalogue service.

use chrono::Utc;
use club_common::{AppError, AppResult, IdGenerator};
use club_db::{entities::item, repositories::ItemRepository};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Input for creating or editing an item.
///
/// On edit, absent fields keep their value.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct ItemInput {
    #[validate(length(max = 200, message = "Name must be at most 200 characters."))]
    pub name: Option<String>,

    pub description: Option<String>,
}

/// Item service for business logic.
#[derive(Clone)]
pub struct ItemService {
    item_repo: ItemRepository,
    id_gen: IdGenerator,
}

impl ItemService {
    /// Create a new item service.
    #[must_use]
    pub const fn new(item_repo: ItemRepository) -> Self {
        Self {
            item_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// List items, newest first.
    pub async fn list(&self) -> AppResult<Vec<item::Model>> {
        self.item_repo.find_all().await
    }

    /// Get an item by ID.
    pub async fn get(&self, id: &str) -> AppResult<item::Model> {
        self.item_repo.get_by_id(id).await
    }

    /// Create an item.
    pub async fn create(&self, input: ItemInput) -> AppResult<item::Model> {
        input.validate()?;

        let name = input.name.unwrap_or_default().trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required.".to_string()));
        }

        let now = Utc::now().fixed_offset();
        let model = item::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name),
            description: Set(input.description.unwrap_or_default()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        self.item_repo.create(model).await
    }

    /// Update an item.
    pub async fn update(&self, id: &str, input: ItemInput) -> AppResult<item::Model> {
        input.validate()?;
        let existing = self.item_repo.get_by_id(id).await?;

        let mut active: item::ActiveModel = existing.into();
        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::Validation("Name is required.".to_string()));
            }
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        self.item_repo.update(active).await
    }

    /// Delete an item.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let existing = self.item_repo.get_by_id(id).await?;
        self.item_repo.delete(&existing.id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_item() -> item::Model {
        item::Model {
            id: "i1".to_string(),
            name: "Chain lube".to_string(),
            description: String::new(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = ItemService::new(ItemRepository::new(db));

        let err = service
            .create(ItemInput {
                name: Some("   ".to_string()),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_missing_item() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<item::Model>::new()])
                .into_connection(),
        );
        let service = ItemService::new(ItemRepository::new(db));

        let err = service.get("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Item not found: nope");
    }

    #[tokio::test]
    async fn test_get_item() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_item()]])
                .into_connection(),
        );
        let service = ItemService::new(ItemRepository::new(db));

        let item = service.get("i1").await.unwrap();
        assert_eq!(item.name, "Chain lube");
    }
}
