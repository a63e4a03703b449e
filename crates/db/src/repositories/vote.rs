//! Vote repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Vote, user, vote};
use club_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store a vote, dropping any earlier vote by the same member in the same
    /// poll. Both steps commit together or not at all.
    pub async fn replace_vote(&self, model: vote::ActiveModel) -> AppResult<vote::Model> {
        let (user_id, poll_id) = match (&model.user_id, &model.poll_id) {
            (sea_orm::ActiveValue::Set(u), sea_orm::ActiveValue::Set(p)) => (u.clone(), p.clone()),
            _ => return Err(AppError::Internal("vote without user or poll".to_string())),
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Vote::delete_many()
            .filter(vote::Column::UserId.eq(&user_id))
            .filter(vote::Column::PollId.eq(&poll_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let vote = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(vote)
    }

    /// Votes of a poll, newest first, with their voters.
    pub async fn find_by_poll_with_users(
        &self,
        poll_id: &str,
    ) -> AppResult<Vec<(vote::Model, Option<user::Model>)>> {
        Vote::find()
            .find_also_related(user::Entity)
            .filter(vote::Column::PollId.eq(poll_id))
            .order_by_desc(vote::Column::VotedAt)
            .order_by_desc(vote::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of votes in a poll.
    pub async fn count_by_poll(&self, poll_id: &str) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::PollId.eq(poll_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Vote totals for several polls. Polls without votes are absent.
    pub async fn count_by_polls(&self, poll_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if poll_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, i64)> = Vote::find()
            .select_only()
            .column(vote::Column::PollId)
            .column_as(Expr::col(vote::Column::Id).count(), "vote_count")
            .filter(vote::Column::PollId.is_in(poll_ids.to_vec()))
            .group_by(vote::Column::PollId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, u64::try_from(count).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};

    fn create_test_vote(id: &str, user_id: &str, choice_id: &str) -> vote::Model {
        vote::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            choice_id: choice_id.to_string(),
            poll_id: "poll1".to_string(),
            voted_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_replace_vote_deletes_then_inserts() {
        let vote = create_test_vote("v2", "u1", "c2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[vote.clone()]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let model = vote::ActiveModel {
            id: Set("v2".to_string()),
            user_id: Set("u1".to_string()),
            choice_id: Set("c2".to_string()),
            poll_id: Set("poll1".to_string()),
            voted_at: Set(vote.voted_at),
        };

        let stored = repo.replace_vote(model).await.unwrap();
        assert_eq!(stored.choice_id, "c2");
    }

    #[tokio::test]
    async fn test_replace_vote_requires_poll() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = VoteRepository::new(db);

        let model = vote::ActiveModel {
            id: Set("v1".to_string()),
            user_id: Set("u1".to_string()),
            choice_id: Set("c1".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            repo.replace_vote(model).await,
            Err(AppError::Internal(_))
        ));
    }
}
