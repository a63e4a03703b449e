//! API endpoints.

mod auth;
mod items;
mod polls;
mod profiles;
mod rides;
mod root;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(root::router())
        .nest("/auth", auth::router())
        .nest("/items", items::router())
        .nest("/profiles", profiles::router())
        .nest("/rides", rides::router())
        .nest("/polls", polls::router())
}
