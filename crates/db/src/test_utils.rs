//! Test utilities for database operations.
//!
//! Provides a migrated in-memory `SQLite` database so repository and service
//! tests run without an external server.

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::migrations::Migrator;

/// URL of a private in-memory `SQLite` database.
pub const SQLITE_MEMORY_URL: &str = "sqlite::memory:";

/// A migrated test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: Arc<DatabaseConnection>,
}

impl TestDatabase {
    /// Create a fresh in-memory database with every migration applied.
    ///
    /// The pool is pinned to a single connection: each `SQLite` memory
    /// connection sees its own database.
    pub async fn in_memory() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new(SQLITE_MEMORY_URL);
        opt.max_connections(1)
            .min_connections(1)
            .idle_timeout(std::time::Duration::from_secs(3600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        info!("Created in-memory test database");

        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Get the database connection.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::{Poll, PollChoice, RideRider, User, Vote, poll, poll_choice, ride, ride_rider, user, vote};
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, Set, Statement};

    async fn insert_user(conn: &DatabaseConnection, id: &str) -> user::Model {
        user::ActiveModel {
            id: Set(id.to_string()),
            username: Set(id.to_string()),
            email: Set(String::new()),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            password: Set("hash".to_string()),
            token: Set(format!("token-{id}")),
            is_staff: Set(false),
            is_active: Set(true),
            date_joined: Set(Utc::now().fixed_offset()),
            last_login: Set(None),
        }
        .insert(conn)
        .await
        .unwrap()
    }

    async fn insert_poll(conn: &DatabaseConnection, creator: &str) -> (poll::Model, Vec<poll_choice::Model>) {
        let poll = poll::ActiveModel {
            id: Set("p1".to_string()),
            title: Set("Where next?".to_string()),
            description: Set(String::new()),
            created_by: Set(Some(creator.to_string())),
            is_active: Set(true),
            created_at: Set(Utc::now().fixed_offset()),
            closes_at: Set(None),
        }
        .insert(conn)
        .await
        .unwrap();

        let mut choices = Vec::new();
        for (position, id) in ["c1", "c2"].into_iter().enumerate() {
            let choice = poll_choice::ActiveModel {
                id: Set(id.to_string()),
                poll_id: Set(poll.id.clone()),
                text: Set(id.to_uppercase()),
                description: Set(String::new()),
                position: Set(position as i32),
            }
            .insert(conn)
            .await
            .unwrap();
            choices.push(choice);
        }
        (poll, choices)
    }

    fn vote_for(id: &str, user_id: &str, choice: &poll_choice::Model) -> vote::ActiveModel {
        vote::ActiveModel {
            id: Set(id.to_string()),
            user_id: Set(user_id.to_string()),
            choice_id: Set(choice.id.clone()),
            poll_id: Set(choice.poll_id.clone()),
            voted_at: Set(Utc::now().fixed_offset()),
        }
    }

    #[tokio::test]
    async fn test_migrations_apply() {
        let db = TestDatabase::in_memory().await.unwrap();
        let conn = db.connection();

        let rows = conn
            .query_all(Statement::from_string(
                conn.get_database_backend(),
                "SELECT name FROM sqlite_master WHERE type = 'table'".to_string(),
            ))
            .await
            .unwrap();
        let tables: Vec<String> = rows
            .into_iter()
            .map(|row| row.try_get::<String>("", "name").unwrap())
            .collect();

        for table in [
            "user",
            "profile",
            "ride",
            "ride_rider",
            "ride_photo",
            "ride_comment",
            "poll",
            "poll_choice",
            "vote",
            "item",
        ] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_migrations_roll_back() {
        let db = TestDatabase::in_memory().await.unwrap();
        Migrator::down(db.conn.as_ref(), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_one_vote_per_member_and_poll() {
        let db = TestDatabase::in_memory().await.unwrap();
        let conn = db.conn.as_ref();
        insert_user(conn, "u1").await;
        let (_, choices) = insert_poll(conn, "u1").await;

        vote_for("v1", "u1", &choices[0]).insert(conn).await.unwrap();
        // A second vote in the same poll breaks the unique index even for
        // another choice
        assert!(vote_for("v2", "u1", &choices[1]).insert(conn).await.is_err());
        assert_eq!(Vote::find().count(conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deleting_member_cascades() {
        let db = TestDatabase::in_memory().await.unwrap();
        let conn = db.conn.as_ref();
        insert_user(conn, "u1").await;
        let (poll, choices) = insert_poll(conn, "u1").await;
        vote_for("v1", "u1", &choices[0]).insert(conn).await.unwrap();

        let now = Utc::now().fixed_offset();
        let ride = ride::ActiveModel {
            id: Set("r1".to_string()),
            title: Set("Coast".to_string()),
            description: Set("Coast road".to_string()),
            date_time: Set(now),
            start_point: Set("Girona".to_string()),
            end_point: Set("Roses".to_string()),
            header_photo: Set(None),
            gpx_file: Set(None),
            calimoto_url: Set(String::new()),
            relive_url: Set(String::new()),
            completed: Set(false),
            created_by: Set(Some("u1".to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await
        .unwrap();
        ride_rider::ActiveModel {
            ride_id: Set(ride.id.clone()),
            user_id: Set("u1".to_string()),
        }
        .insert(conn)
        .await
        .unwrap();

        User::delete_by_id("u1").exec(conn).await.unwrap();

        assert_eq!(Vote::find().count(conn).await.unwrap(), 0);
        assert_eq!(RideRider::find().count(conn).await.unwrap(), 0);
        assert_eq!(PollChoice::find().count(conn).await.unwrap(), 2);

        let poll = Poll::find_by_id(poll.id).one(conn).await.unwrap().unwrap();
        assert!(poll.created_by.is_none());
        let ride = crate::entities::Ride::find_by_id(ride.id).one(conn).await.unwrap().unwrap();
        assert!(ride.created_by.is_none());
    }
}
