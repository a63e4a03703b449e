//! Poll endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use club_common::AppResult;
use club_core::{ChoiceInput, CreatePollInput, UpdatePollInput};
use club_db::entities::{poll, user};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{
        MessageResponse, PollChoiceResponse, PollDetailResponse, PollListResponse, VoteResponse,
    },
};

/// Poll list filters.
#[derive(Debug, Default, Deserialize)]
pub struct PollQuery {
    pub active: Option<String>,
}

async fn list_polls(
    State(state): State<AppState>,
    Query(query): Query<PollQuery>,
) -> AppResult<Json<Vec<PollListResponse>>> {
    let active_only = query.active.as_deref() == Some("true");
    let polls = state.poll_service.list_summaries(active_only).await?;
    Ok(Json(polls.iter().map(PollListResponse::from).collect()))
}

async fn poll_detail(
    state: &AppState,
    poll: poll::Model,
    viewer: Option<&user::Model>,
) -> AppResult<Json<PollDetailResponse>> {
    let detail = state.poll_service.poll_detail(poll, viewer).await?;
    Ok(Json(PollDetailResponse::from(&detail)))
}

async fn create_poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePollInput>,
) -> AppResult<(StatusCode, Json<PollDetailResponse>)> {
    let (poll, _) = state.poll_service.create_poll(&user, input).await?;
    Ok((
        StatusCode::CREATED,
        poll_detail(&state, poll, Some(&user)).await?,
    ))
}

async fn active_poll(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let Some(poll) = state.poll_service.active_poll().await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(MessageResponse::new("No active polls")),
        )
            .into_response());
    };

    Ok(poll_detail(&state, poll, user.as_ref())
        .await?
        .into_response())
}

async fn get_poll(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PollDetailResponse>> {
    let poll = state.poll_service.get(&id).await?;
    poll_detail(&state, poll, user.as_ref()).await
}

async fn update_poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePollInput>,
) -> AppResult<Json<PollDetailResponse>> {
    let poll = state.poll_service.update_poll(&user, &id, input).await?;
    poll_detail(&state, poll, Some(&user)).await
}

async fn delete_poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.poll_service.delete_poll(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_choice(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ChoiceInput>,
) -> AppResult<(StatusCode, Json<PollChoiceResponse>)> {
    let choice = state.poll_service.add_choice(&user, &id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(PollChoiceResponse {
            id: choice.id,
            text: choice.text,
            description: choice.description,
            vote_count: 0,
            voters: Vec::new(),
            percentage: 0.0,
        }),
    ))
}

/// Vote request.
#[derive(Debug, Default, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub choice_id: Option<String>,
}

async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<(StatusCode, Json<VoteResponse>)> {
    let vote = state
        .poll_service
        .cast_vote(&id, req.choice_id.as_deref(), &user)
        .await?;

    Ok((StatusCode::CREATED, Json(VoteResponse::new(&vote, &user))))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_polls).post(create_poll))
        .route("/active", get(active_poll))
        .route(
            "/{id}",
            get(get_poll)
                .put(update_poll)
                .patch(update_poll)
                .delete(delete_poll),
        )
        .route("/{id}/choices", post(add_choice))
        .route("/{id}/vote", post(vote))
}
