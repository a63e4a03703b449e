//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use club_common::AppResult;
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{MessageResponse, SigninResponse},
};

/// Signin request.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Exchange a username and password for an access token.
async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> AppResult<Json<SigninResponse>> {
    let user = state
        .user_service
        .authenticate(&req.username, &req.password)
        .await?;

    Ok(Json(SigninResponse {
        id: user.id,
        username: user.username,
        token: user.token,
        is_staff: user.is_staff,
    }))
}

/// Invalidate the caller's access token.
async fn signout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<MessageResponse>> {
    state.user_service.rotate_token(&user.id).await?;
    Ok(Json(MessageResponse::new("Signed out")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signin", post(signin))
        .route("/signout", post(signout))
}
