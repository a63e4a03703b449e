//! Poll and poll choice repository.

use std::sync::Arc;

use crate::entities::{Poll, PollChoice, poll, poll_choice};
use club_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, sea_query::Expr,
};

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PollNotFound(id.to_string()))
    }

    /// List polls, newest first.
    pub async fn find_all(&self, active_only: bool) -> AppResult<Vec<poll::Model>> {
        let mut query = Poll::find();
        if active_only {
            query = query.filter(poll::Column::IsActive.eq(true));
        }

        query
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// First active poll in listing order.
    pub async fn find_first_active(&self) -> AppResult<Option<poll::Model>> {
        Poll::find()
            .filter(poll::Column::IsActive.eq(true))
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a poll and its choices in one transaction.
    pub async fn create_with_choices(
        &self,
        model: poll::ActiveModel,
        choices: Vec<poll_choice::ActiveModel>,
    ) -> AppResult<(poll::Model, Vec<poll_choice::Model>)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut created = Vec::with_capacity(choices.len());
        for choice in choices {
            created.push(
                choice
                    .insert(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?,
            );
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((poll, created))
    }

    /// Update a poll.
    pub async fn update(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a poll. Choices and votes go with it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Poll::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Choices of a poll in insertion order.
    pub async fn find_choices(&self, poll_id: &str) -> AppResult<Vec<poll_choice::Model>> {
        PollChoice::find()
            .filter(poll_choice::Column::PollId.eq(poll_id))
            .order_by_asc(poll_choice::Column::Position)
            .order_by_asc(poll_choice::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Choices of several polls.
    pub async fn find_choices_for(&self, poll_ids: &[String]) -> AppResult<Vec<poll_choice::Model>> {
        if poll_ids.is_empty() {
            return Ok(vec![]);
        }

        PollChoice::find()
            .filter(poll_choice::Column::PollId.is_in(poll_ids.to_vec()))
            .order_by_asc(poll_choice::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a choice by ID.
    pub async fn find_choice(&self, id: &str) -> AppResult<Option<poll_choice::Model>> {
        PollChoice::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Position after the last existing choice of a poll.
    pub async fn next_choice_position(&self, poll_id: &str) -> AppResult<i32> {
        let max: Option<Option<i32>> = PollChoice::find()
            .select_only()
            .column_as(Expr::col(poll_choice::Column::Position).max(), "max_position")
            .filter(poll_choice::Column::PollId.eq(poll_id))
            .into_tuple()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(max.flatten().map_or(0, |m| m + 1))
    }

    /// Create a choice.
    pub async fn create_choice(
        &self,
        model: poll_choice::ActiveModel,
    ) -> AppResult<poll_choice::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_poll(id: &str, is_active: bool) -> poll::Model {
        poll::Model {
            id: id.to_string(),
            title: "Next destination".to_string(),
            description: String::new(),
            created_by: None,
            is_active,
            created_at: Utc::now().into(),
            closes_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<poll::Model>::new()])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        assert!(matches!(
            repo.get_by_id("p1").await,
            Err(AppError::PollNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_first_active() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_poll("p2", true)]])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        let poll = repo.find_first_active().await.unwrap().unwrap();
        assert_eq!(poll.id, "p2");
        assert!(poll.is_active);
    }

    #[tokio::test]
    async fn test_find_choices_for_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = PollRepository::new(db);

        assert!(repo.find_choices_for(&[]).await.unwrap().is_empty());
    }
}
