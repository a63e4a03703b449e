//! API discovery endpoint.

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::middleware::AppState;

/// List the API collections.
async fn api_root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the API",
        "endpoints": {
            "items": "/api/items/",
            "profiles": "/api/profiles/",
            "rides": "/api/rides/",
            "polls": "/api/polls/",
            "signin": "/api/auth/signin",
        }
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(api_root))
}
