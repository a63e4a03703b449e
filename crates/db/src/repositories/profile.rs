//! Profile repository.

use std::sync::Arc;

use crate::entities::{Profile, profile, user};
use club_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::OnConflict,
};

/// Profile repository for database operations.
#[derive(Clone)]
pub struct ProfileRepository {
    db: Arc<DatabaseConnection>,
}

impl ProfileRepository {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a profile by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<profile::Model>> {
        Profile::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a profile by ID together with its user.
    pub async fn find_with_user(
        &self,
        id: &str,
    ) -> AppResult<Option<(profile::Model, user::Model)>> {
        let row = Profile::find_by_id(id)
            .find_also_related(user::Entity)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.and_then(|(profile, user)| user.map(|u| (profile, u))))
    }

    /// Find the profile belonging to a user.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<profile::Model>> {
        Profile::find()
            .filter(profile::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find profiles of several users.
    pub async fn find_by_user_ids(&self, user_ids: &[String]) -> AppResult<Vec<profile::Model>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        Profile::find()
            .filter(profile::Column::UserId.is_in(user_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List profiles with their users, ordered by username.
    ///
    /// `username` narrows the list to an exact username.
    pub async fn find_all_with_users(
        &self,
        username: Option<&str>,
    ) -> AppResult<Vec<(profile::Model, user::Model)>> {
        let mut query = Profile::find()
            .find_also_related(user::Entity)
            .order_by_asc(user::Column::Username);

        if let Some(username) = username {
            query = query.filter(user::Column::Username.eq(username));
        }

        let rows = query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|(profile, user)| user.map(|u| (profile, u)))
            .collect())
    }

    /// Insert a profile unless the user already has one.
    ///
    /// Returns the stored profile either way, so two racing callers end up
    /// with the same row.
    pub async fn insert_if_absent(&self, model: profile::ActiveModel) -> AppResult<profile::Model> {
        let user_id = match &model.user_id {
            sea_orm::ActiveValue::Set(id) | sea_orm::ActiveValue::Unchanged(id) => id.clone(),
            sea_orm::ActiveValue::NotSet => {
                return Err(AppError::Internal("profile without user_id".to_string()));
            }
        };

        Profile::insert(model)
            .on_conflict(
                OnConflict::column(profile::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_user_id(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id}")))
    }

    /// Update a profile.
    pub async fn update(&self, model: profile::ActiveModel) -> AppResult<profile::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a profile.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Profile::delete_by_id(id)
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
    use sea_orm::{DatabaseBackend, MockDatabase, Set};

    fn create_test_profile(id: &str, user_id: &str) -> profile::Model {
        profile::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            avatar: None,
            bike_photo_1: None,
            bike_photo_2: None,
            bike_photo_3: None,
            bio: "Twisties every Sunday".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_user_id() {
        let profile = create_test_profile("p1", "u1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[profile]])
                .into_connection(),
        );

        let repo = ProfileRepository::new(db);
        let found = repo.find_by_user_id("u1").await.unwrap().unwrap();

        assert_eq!(found.id, "p1");
        assert_eq!(found.bio, "Twisties every Sunday");
    }

    #[tokio::test]
    async fn test_insert_if_absent_requires_user() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = ProfileRepository::new(db);

        let model = profile::ActiveModel {
            id: Set("p1".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            repo.insert_if_absent(model).await,
            Err(AppError::Internal(_))
        ));
    }
}
