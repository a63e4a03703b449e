//! Membership service: registration, login and member administration.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use club_common::{AppError, AppResult, IdGenerator};
use club_db::{
    entities::{profile, user},
    repositories::UserRepository,
};
use sea_orm::Set;
use serde::Deserialize;
use validator::{Validate, ValidateEmail};

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for self-registration.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[serde(default)]
    #[validate(length(max = 150, message = "Username is too long."))]
    pub username: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub password2: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
}

/// Input for a member account created by staff.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct NewMemberInput {
    #[serde(default)]
    #[validate(length(max = 150, message = "Username is too long."))]
    pub username: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Find a user by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        self.user_repo.find_by_username(username).await
    }

    /// Register a new member together with an empty profile.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        let username = input.username.trim().to_string();

        if username.is_empty() || input.password.is_empty() {
            return Err(AppError::Validation(
                "Username and password are required.".to_string(),
            ));
        }
        if input.password != input.password2 {
            return Err(AppError::Validation("Passwords do not match.".to_string()));
        }
        input.validate()?;
        validate_email(&input.email)?;

        if self.user_repo.find_by_username(&username).await?.is_some() {
            return Err(AppError::Validation(format!(
                "Username \"{username}\" is already taken."
            )));
        }

        let user = self
            .insert_member(
                &username,
                &input.email,
                &input.password,
                &input.first_name,
                &input.last_name,
                false,
            )
            .await
            .map_err(|e| username_taken(e, format!("Username \"{username}\" is already taken.")))?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Create a member account on behalf of staff.
    pub async fn create_member(
        &self,
        actor: &user::Model,
        input: NewMemberInput,
    ) -> AppResult<user::Model> {
        require_staff(actor)?;

        let username = input.username.trim().to_string();
        if username.is_empty() || input.password.is_empty() {
            return Err(AppError::Validation(
                "Username and password are required.".to_string(),
            ));
        }
        input.validate()?;
        validate_email(&input.email)?;

        if self.user_repo.find_by_username(&username).await?.is_some() {
            return Err(AppError::Validation(format!(
                "Username \"{username}\" already exists."
            )));
        }

        let user = self
            .insert_member(
                &username,
                &input.email,
                &input.password,
                &input.first_name,
                &input.last_name,
                false,
            )
            .await
            .map_err(|e| username_taken(e, format!("Username \"{username}\" already exists.")))?;

        tracing::info!(
            user_id = %user.id,
            username = %user.username,
            added_by = %actor.id,
            "Member added"
        );
        Ok(user)
    }

    async fn insert_member(
        &self,
        username: &str,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        is_staff: bool,
    ) -> AppResult<user::Model> {
        let password_hash = hash_password(password)?;
        let now = Utc::now().fixed_offset();
        let user_id = self.id_gen.generate();

        let user_model = user::ActiveModel {
            id: Set(user_id.clone()),
            username: Set(username.to_string()),
            email: Set(email.trim().to_string()),
            first_name: Set(first_name.trim().to_string()),
            last_name: Set(last_name.trim().to_string()),
            password: Set(password_hash),
            token: Set(self.id_gen.generate_token()),
            is_staff: Set(is_staff),
            is_active: Set(true),
            date_joined: Set(now),
            last_login: Set(None),
        };

        let profile_model = profile::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id),
            avatar: Set(None),
            bike_photo_1: Set(None),
            bike_photo_2: Set(None),
            bike_photo_3: Set(None),
            bio: Set(String::new()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let (user, _) = self
            .user_repo
            .create_with_profile(user_model, profile_model)
            .await?;
        Ok(user)
    }

    /// Check a username and password.
    ///
    /// Every failure yields the same error so callers cannot tell which part
    /// was wrong.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let Some(user) = self.user_repo.find_by_username(username.trim()).await? else {
            return Err(AppError::InvalidCredentials);
        };

        if !user.is_active || !verify_password(password, &user.password)? {
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now().fixed_offset();
        self.user_repo.touch_last_login(&user.id, now).await?;

        tracing::info!(user_id = %user.id, "User signed in");
        Ok(user::Model {
            last_login: Some(now),
            ..user
        })
    }

    /// Resolve an access token to an active user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self
            .user_repo
            .find_by_token(token)
            .await?
            .filter(|u| u.is_active))
    }

    /// Issue a fresh access token, invalidating the old one.
    pub async fn rotate_token(&self, user_id: &str) -> AppResult<user::Model> {
        let token = self.id_gen.generate_token();
        self.user_repo.set_token(user_id, &token).await
    }

    /// Members ordered by username, with their profiles.
    pub async fn list_members(&self) -> AppResult<Vec<(user::Model, Option<profile::Model>)>> {
        self.user_repo.find_all_with_profiles().await
    }

    /// Delete a member account on behalf of staff.
    ///
    /// Returns the deleted user.
    pub async fn delete_member(&self, actor: &user::Model, target_id: &str) -> AppResult<user::Model> {
        require_staff(actor)?;

        let target = self.user_repo.get_by_id(target_id).await?;
        if target.id == actor.id {
            return Err(AppError::Validation("You cannot delete yourself.".to_string()));
        }

        self.user_repo.delete(&target.id).await?;

        tracing::info!(
            user_id = %target.id,
            username = %target.username,
            deleted_by = %actor.id,
            "Member deleted"
        );
        Ok(target)
    }

    /// Create a staff account, or promote and re-key an existing one.
    pub async fn ensure_staff_account(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> AppResult<user::Model> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::Config(
                "Staff bootstrap needs a username and a password".to_string(),
            ));
        }

        if let Some(existing) = self.user_repo.find_by_username(username.trim()).await? {
            let mut active: user::ActiveModel = existing.into();
            active.is_staff = Set(true);
            active.is_active = Set(true);
            active.password = Set(hash_password(password)?);
            let user = self.user_repo.update(active).await?;
            tracing::info!(user_id = %user.id, "Staff account updated");
            return Ok(user);
        }

        let user = self
            .insert_member(username.trim(), email, password, "", "", true)
            .await?;
        tracing::info!(user_id = %user.id, username = %user.username, "Staff account created");
        Ok(user)
    }
}

/// Fail unless the user is staff.
pub fn require_staff(user: &user::Model) -> AppResult<()> {
    if user.is_staff {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only staff members can do this.".to_string(),
        ))
    }
}

fn validate_email(email: &str) -> AppResult<()> {
    let email = email.trim();
    if email.is_empty() || email.validate_email() {
        Ok(())
    } else {
        Err(AppError::Validation("Enter a valid email address.".to_string()))
    }
}

/// A concurrent signup won the username between the lookup and the insert.
fn username_taken(err: AppError, message: String) -> AppError {
    match err {
        AppError::Conflict(_) => AppError::Validation(message),
        err => err,
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str, is_staff: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            password: hash_password("secret").unwrap(),
            token: format!("token-{id}"),
            is_staff,
            is_active: true,
            date_joined: Utc::now().into(),
            last_login: None,
        }
    }

    fn service(db: MockDatabase) -> UserService {
        UserService::new(UserRepository::new(Arc::new(db.into_connection())))
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(hash.len() > 50);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_requires_username_and_password() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let err = svc
            .register(RegisterInput {
                username: "  ".to_string(),
                password: "x".to_string(),
                password2: "x".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Username and password are required.");
    }

    #[tokio::test]
    async fn test_register_password_mismatch() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let err = svc
            .register(RegisterInput {
                username: "anna".to_string(),
                password: "one".to_string(),
                password2: "two".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match.");
    }

    #[tokio::test]
    async fn test_register_username_taken() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", "anna", false)]]),
        );

        let err = svc
            .register(RegisterInput {
                username: "anna".to_string(),
                password: "pw".to_string(),
                password2: "pw".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Username \"anna\" is already taken.");
    }

    #[test]
    fn test_username_taken_maps_conflict_only() {
        let err = username_taken(
            AppError::Conflict("UNIQUE constraint failed: user.username".to_string()),
            "Username \"anna\" is already taken.".to_string(),
        );
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), "Username \"anna\" is already taken.");

        let err = username_taken(AppError::Database("gone".to_string()), String::new());
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_email() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let err = svc
            .register(RegisterInput {
                username: "anna".to_string(),
                email: "not-an-email".to_string(),
                password: "pw".to_string(),
                password2: "pw".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let err = svc.authenticate("ghost", "secret").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", "anna", false)]]),
        );

        let err = svc.authenticate("anna", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_authenticate_inactive_user() {
        let mut user = create_test_user("u1", "anna", false);
        user.is_active = false;
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let err = svc.authenticate("anna", "secret").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_create_member_requires_staff() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let actor = create_test_user("u1", "anna", false);

        let err = svc
            .create_member(
                &actor,
                NewMemberInput {
                    username: "pau".to_string(),
                    password: "pw".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_delete_member_self() {
        let actor = create_test_user("u1", "boss", true);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[actor.clone()]]),
        );

        let err = svc.delete_member(&actor, "u1").await.unwrap_err();
        assert_eq!(err.to_string(), "You cannot delete yourself.");
    }

    #[tokio::test]
    async fn test_delete_member_missing() {
        let actor = create_test_user("u1", "boss", true);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let err = svc.delete_member(&actor, "u404").await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_authenticate_by_empty_token() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        assert!(svc.authenticate_by_token("").await.unwrap().is_none());
    }
}
