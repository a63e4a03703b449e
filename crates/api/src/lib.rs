//! HTTP API layer for the club application.
//!
//! This crate provides the JSON API:
//!
//! - **Endpoints**: members, profiles, rides, polls and items
//! - **Extractors**: token authentication
//! - **Middleware**: shared application state and session resolution
//! - **Multipart**: uploaded form parsing shared with the pages
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod multipart;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
