//! Ride repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Ride, RideRider, ride, ride_rider, user};
use chrono::{DateTime, FixedOffset};
use club_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

/// Filters for listing rides.
#[derive(Debug, Clone, Copy, Default)]
pub struct RideFilter {
    /// Only rides with this completion state.
    pub completed: Option<bool>,
    /// Only rides starting strictly after this instant.
    pub upcoming_after: Option<DateTime<FixedOffset>>,
}

/// Ride repository for database operations.
#[derive(Clone)]
pub struct RideRepository {
    db: Arc<DatabaseConnection>,
}

impl RideRepository {
    /// Create a new ride repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a ride by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<ride::Model>> {
        Ride::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a ride by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<ride::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::RideNotFound(id.to_string()))
    }

    /// List rides, newest start first.
    pub async fn find_all(&self, filter: RideFilter) -> AppResult<Vec<ride::Model>> {
        let mut query = Ride::find();

        if let Some(completed) = filter.completed {
            query = query.filter(ride::Column::Completed.eq(completed));
        }
        if let Some(after) = filter.upcoming_after {
            query = query.filter(ride::Column::DateTime.gt(after));
        }

        query
            .order_by_desc(ride::Column::DateTime)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Earliest incomplete ride starting after `now`.
    pub async fn find_next_incomplete(
        &self,
        now: DateTime<FixedOffset>,
    ) -> AppResult<Option<ride::Model>> {
        Ride::find()
            .filter(ride::Column::Completed.eq(false))
            .filter(ride::Column::DateTime.gt(now))
            .order_by_asc(ride::Column::DateTime)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most recent incomplete ride regardless of its start time.
    pub async fn find_latest_incomplete(&self) -> AppResult<Option<ride::Model>> {
        Ride::find()
            .filter(ride::Column::Completed.eq(false))
            .order_by_desc(ride::Column::DateTime)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a ride and its initial riders in one transaction.
    pub async fn create_with_riders(
        &self,
        model: ride::ActiveModel,
        rider_ids: &[String],
    ) -> AppResult<ride::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let ride = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        insert_riders(&txn, &ride.id, rider_ids).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ride)
    }

    /// Update a ride.
    pub async fn update(&self, model: ride::ActiveModel) -> AppResult<ride::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a ride and, when given, replace its full rider set. Both
    /// commit together or not at all.
    pub async fn update_with_riders(
        &self,
        model: ride::ActiveModel,
        rider_ids: Option<&[String]>,
    ) -> AppResult<ride::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let ride = model
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(rider_ids) = rider_ids {
            RideRider::delete_many()
                .filter(ride_rider::Column::RideId.eq(&ride.id))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            insert_riders(&txn, &ride.id, rider_ids).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ride)
    }

    /// Delete a ride.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Ride::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Add a rider. Adding an existing rider is a no-op.
    pub async fn add_rider(&self, ride_id: &str, user_id: &str) -> AppResult<()> {
        let model = ride_rider::ActiveModel {
            ride_id: Set(ride_id.to_string()),
            user_id: Set(user_id.to_string()),
        };

        RideRider::insert(model)
            .on_conflict(
                OnConflict::columns([ride_rider::Column::RideId, ride_rider::Column::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Remove a rider. Removing a non-rider is a no-op.
    pub async fn remove_rider(&self, ride_id: &str, user_id: &str) -> AppResult<()> {
        RideRider::delete_many()
            .filter(ride_rider::Column::RideId.eq(ride_id))
            .filter(ride_rider::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Whether a user rides along.
    pub async fn is_rider(&self, ride_id: &str, user_id: &str) -> AppResult<bool> {
        let count = RideRider::find()
            .filter(ride_rider::Column::RideId.eq(ride_id))
            .filter(ride_rider::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Riders of a ride ordered by username.
    pub async fn find_riders(&self, ride: &ride::Model) -> AppResult<Vec<user::Model>> {
        ride.find_related(user::Entity)
            .order_by_asc(user::Column::Username)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of riders of a ride.
    pub async fn count_riders(&self, ride_id: &str) -> AppResult<u64> {
        RideRider::find()
            .filter(ride_rider::Column::RideId.eq(ride_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Rider counts for several rides. Rides without riders are absent.
    pub async fn count_riders_for(&self, ride_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if ride_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, i64)> = RideRider::find()
            .select_only()
            .column(ride_rider::Column::RideId)
            .column_as(Expr::col(ride_rider::Column::UserId).count(), "rider_count")
            .filter(ride_rider::Column::RideId.is_in(ride_ids.to_vec()))
            .group_by(ride_rider::Column::RideId)
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


async fn insert_riders<C: ConnectionTrait>(
    conn: &C,
    ride_id: &str,
    rider_ids: &[String],
) -> AppResult<()> {
    if rider_ids.is_empty() {
        return Ok(());
    }

    let rows = rider_ids.iter().map(|user_id| ride_rider::ActiveModel {
        ride_id: Set(ride_id.to_string()),
        user_id: Set(user_id.clone()),
    });
    RideRider::insert_many(rows)
        .on_conflict(
            OnConflict::columns([ride_rider::Column::RideId, ride_rider::Column::UserId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_ride(id: &str, completed: bool) -> ride::Model {
        ride::Model {
            id: id.to_string(),
            title: "Coastal loop".to_string(),
            description: "Tossa to Sant Feliu".to_string(),
            date_time: (Utc::now() + Duration::days(3)).into(),
            start_point: "Girona".to_string(),
            end_point: "Tossa de Mar".to_string(),
            header_photo: None,
            gpx_file: None,
            calimoto_url: String::new(),
            relive_url: String::new(),
            completed,
            created_by: Some("u1".to_string()),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<ride::Model>::new()])
                .into_connection(),
        );

        let repo = RideRepository::new(db);
        let result = repo.get_by_id("nope").await;

        assert!(matches!(result, Err(AppError::RideNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_all_returns_rows() {
        let rides = vec![create_test_ride("r2", true), create_test_ride("r1", true)];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rides])
                .into_connection(),
        );

        let repo = RideRepository::new(db);
        let result = repo
            .find_all(RideFilter {
                completed: Some(true),
                upcoming_after: None,
            })
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "r2");
    }

    #[tokio::test]
    async fn test_count_riders_for_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = RideRepository::new(db);

        assert!(repo.count_riders_for(&[]).await.unwrap().is_empty());
    }
}
