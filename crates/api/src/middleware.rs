//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use chrono_tz::Tz;
use club_common::{AppResult, Config, StorageBackend};
use club_core::{
    ItemService, MediaService, PollService, ProfileService, RideService, UserService,
};
use club_db::repositories::{
    ItemRepository, PollRepository, ProfileRepository, RideCommentRepository,
    RidePhotoRepository, RideRepository, UserRepository, VoteRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub timezone: Tz,
    pub media: MediaService,
    pub user_service: UserService,
    pub profile_service: ProfileService,
    pub ride_service: RideService,
    pub poll_service: PollService,
    pub item_service: ItemService,
}

impl AppState {
    /// Wire every service onto one database connection and storage backend.
    pub fn new(
        db: Arc<DatabaseConnection>,
        storage: Arc<dyn StorageBackend>,
        config: Config,
    ) -> AppResult<Self> {
        let timezone = config.club.tz()?;
        let media = MediaService::new(storage, config.storage.max_upload_bytes);

        let user_repo = UserRepository::new(Arc::clone(&db));
        let profile_repo = ProfileRepository::new(Arc::clone(&db));

        Ok(Self {
            user_service: UserService::new(user_repo.clone()),
            profile_service: ProfileService::new(profile_repo.clone(), media.clone()),
            ride_service: RideService::new(
                RideRepository::new(Arc::clone(&db)),
                RidePhotoRepository::new(Arc::clone(&db)),
                RideCommentRepository::new(Arc::clone(&db)),
                user_repo.clone(),
                media.clone(),
                timezone,
            ),
            poll_service: PollService::new(
                PollRepository::new(Arc::clone(&db)),
                VoteRepository::new(Arc::clone(&db)),
                user_repo,
                profile_repo,
                media.clone(),
            ),
            item_service: ItemService::new(ItemRepository::new(db)),
            config: Arc::new(config),
            timezone,
            media,
        })
    }
}

/// Bearer token from an `Authorization` header.
fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Authentication middleware.
///
/// Resolves the acting member from a bearer token, falling back to the
/// session cookie the pages set, and stores it in the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = bearer_token(&req).map(ToString::to_string).or_else(|| {
        CookieJar::from_headers(req.headers())
            .get(&state.config.auth.cookie_name)
            .map(|c| c.value().to_string())
    });

    if let Some(token) = token {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => {
                tracing::debug!("Ignoring unknown access token");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resolve access token");
            }
        }
    }

    next.run(req).await
}
