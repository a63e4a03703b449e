//! User repository.

use std::sync::Arc;

use crate::entities::{User, profile, user};
use club_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(user::Column::Username)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by exact username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All users ordered by username, each with its profile if one exists.
    pub async fn find_all_with_profiles(
        &self,
    ) -> AppResult<Vec<(user::Model, Option<profile::Model>)>> {
        User::find()
            .find_also_related(profile::Entity)
            .order_by_asc(user::Column::Username)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a user together with its profile in one transaction.
    pub async fn create_with_profile(
        &self,
        user_model: user::ActiveModel,
        profile_model: profile::ActiveModel,
    ) -> AppResult<(user::Model, profile::Model)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let user = user_model.insert(&txn).await.map_err(insert_error)?;
        let profile = profile_model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((user, profile))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record a successful login.
    pub async fn touch_last_login(
        &self,
        id: &str,
        at: chrono::DateTime<chrono::FixedOffset>,
    ) -> AppResult<()> {
        User::update_many()
            .col_expr(user::Column::LastLogin, sea_orm::sea_query::Expr::value(at))
            .filter(user::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Replace a user's access token.
    pub async fn set_token(&self, id: &str, token: &str) -> AppResult<user::Model> {
        let user = self.get_by_id(id).await?;
        let mut active: user::ActiveModel = user.into();
        active.token = Set(token.to_string());
        self.update(active).await
    }

    /// Delete a user.
    ///
    /// Dependent rows go through the foreign key actions in the same
    /// statement: profile, votes, participations, photos and comments are
    /// removed while authored rides and polls lose their creator.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let result = User::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}

/// A unique index rejected the row: the username is taken.
fn insert_error(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Conflict(detail),
        _ => AppError::Database(e.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            password: "hash".to_string(),
            token: format!("token-{id}"),
            is_staff: false,
            is_active: true,
            date_joined: Utc::now().into(),
            last_login: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = create_test_user("user1", "marta");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_id("user1").await.unwrap();

        let found = result.unwrap();
        assert_eq!(found.id, "user1");
        assert_eq!(found.username, "marta");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = UserRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_token() {
        let user = create_test_user("user1", "jordi");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let found = repo.find_by_token("token-user1").await.unwrap().unwrap();

        assert_eq!(found.username, "jordi");
    }

    #[tokio::test]
    async fn test_create_with_profile_duplicate_username() {
        use crate::{entities::Profile, test_utils::TestDatabase};
        use sea_orm::PaginatorTrait;

        let db = TestDatabase::in_memory().await.unwrap();
        let repo = UserRepository::new(db.connection());

        let rows = |id: &str| {
            let now = Utc::now().fixed_offset();
            let user = user::ActiveModel {
                id: Set(id.to_string()),
                username: Set("anna".to_string()),
                email: Set(String::new()),
                first_name: Set(String::new()),
                last_name: Set(String::new()),
                password: Set("hash".to_string()),
                token: Set(format!("token-{id}")),
                is_staff: Set(false),
                is_active: Set(true),
                date_joined: Set(now),
                last_login: Set(None),
            };
            let profile = profile::ActiveModel {
                id: Set(format!("profile-{id}")),
                user_id: Set(id.to_string()),
                avatar: Set(None),
                bike_photo_1: Set(None),
                bike_photo_2: Set(None),
                bike_photo_3: Set(None),
                bio: Set(String::new()),
                created_at: Set(now),
                updated_at: Set(now),
            };
            (user, profile)
        };

        let (user, profile) = rows("u1");
        repo.create_with_profile(user, profile).await.unwrap();

        let (user, profile) = rows("u2");
        let result = repo.create_with_profile(user, profile).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let conn = db.conn.as_ref();
        assert_eq!(User::find().count(conn).await.unwrap(), 1);
        assert_eq!(Profile::find().count(conn).await.unwrap(), 1);
    }
}
