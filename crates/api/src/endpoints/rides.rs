//! Ride endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use chrono::Utc;
use club_common::{AppError, AppResult};
use club_core::{RideInput, Upload};
use club_db::repositories::RideFilter;
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    multipart::MultipartForm,
    response::{
        MessageResponse, RideCommentResponse, RideDetailResponse, RideListResponse,
        RidePhotoResponse,
    },
};

/// Ride list filters.
#[derive(Debug, Default, Deserialize)]
pub struct RideQuery {
    pub upcoming: Option<String>,
    pub completed: Option<String>,
}

fn query_flag(value: Option<&str>) -> Option<bool> {
    match value? {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

impl RideQuery {
    fn filter(&self) -> RideFilter {
        RideFilter {
            completed: query_flag(self.completed.as_deref()),
            upcoming_after: (query_flag(self.upcoming.as_deref()) == Some(true))
                .then(|| Utc::now().fixed_offset()),
        }
    }
}

async fn list_rides(
    State(state): State<AppState>,
    Query(query): Query<RideQuery>,
) -> AppResult<Json<Vec<RideListResponse>>> {
    let rides = state.ride_service.list_summaries(query.filter()).await?;
    Ok(Json(
        rides
            .iter()
            .map(|summary| RideListResponse::new(summary, &state.media))
            .collect(),
    ))
}

async fn ride_detail(state: &AppState, id: &str) -> AppResult<Json<RideDetailResponse>> {
    let ride = state.ride_service.get(id).await?;
    let detail = state.ride_service.detail(ride).await?;
    Ok(Json(RideDetailResponse::new(&detail, &state.media)))
}

async fn create_ride(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RideInput>,
) -> AppResult<(StatusCode, Json<RideDetailResponse>)> {
    let ride = state.ride_service.create_ride(&user, input).await?;
    Ok((StatusCode::CREATED, ride_detail(&state, &ride.id).await?))
}

async fn upcoming_ride(State(state): State<AppState>) -> AppResult<Response> {
    let Some(ride) = state
        .ride_service
        .upcoming(Utc::now().fixed_offset())
        .await?
    else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(MessageResponse::new("No upcoming rides")),
        )
            .into_response());
    };

    let detail = state.ride_service.detail(ride).await?;
    Ok(Json(RideDetailResponse::new(&detail, &state.media)).into_response())
}

async fn get_ride(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<RideDetailResponse>> {
    ride_detail(&state, &id).await
}

async fn update_ride(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<RideInput>,
) -> AppResult<Json<RideDetailResponse>> {
    let ride = state.ride_service.edit_ride(&user, &id, input).await?;
    ride_detail(&state, &ride.id).await
}

async fn delete_ride(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.ride_service.delete_ride(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload `header_photo` and/or `gpx_file`.
async fn upload_ride_files(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Json<RideDetailResponse>> {
    let mut form = MultipartForm::read(multipart).await?;
    let header_photo = form.take_file("header_photo");
    let gpx_file = form.take_file("gpx_file");

    let ride = state
        .ride_service
        .set_ride_files(&user, &id, header_photo.as_ref(), gpx_file.as_ref())
        .await?;
    ride_detail(&state, &ride.id).await
}

async fn join_ride(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.ride_service.join(&id, &user).await?;
    Ok(Json(MessageResponse::new("Successfully joined the ride")))
}

async fn leave_ride(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.ride_service.leave(&id, &user).await?;
    Ok(Json(MessageResponse::new("Successfully left the ride")))
}

async fn list_photos(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<RidePhotoResponse>>> {
    let photos = state.ride_service.list_photos(&id).await?;
    Ok(Json(
        photos
            .iter()
            .map(|(photo, uploader)| RidePhotoResponse::new(photo, uploader.as_ref(), &state.media))
            .collect(),
    ))
}

fn parse_order(value: Option<&str>) -> AppResult<Option<i32>> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<i32>()
                .map_err(|_| AppError::Validation("order must be an integer.".to_string()))
        })
        .transpose()
}

/// Upload a `photo` with optional `caption` and `order`.
async fn add_photo(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<RidePhotoResponse>)> {
    let mut form = MultipartForm::read(multipart).await?;
    let upload: Upload = form
        .take_file("photo")
        .ok_or_else(|| AppError::Validation("photo is required".to_string()))?;
    let order = parse_order(form.text("order"))?;

    let photo = state
        .ride_service
        .add_photo(&id, &user, &upload, form.text_owned("caption"), order)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RidePhotoResponse::new(&photo, Some(&user), &state.media)),
    ))
}

/// Photo edit request.
#[derive(Debug, Deserialize)]
pub struct UpdatePhotoRequest {
    pub caption: Option<String>,
    pub order: Option<i32>,
}

async fn update_photo(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, photo_id)): Path<(String, String)>,
    Json(req): Json<UpdatePhotoRequest>,
) -> AppResult<Json<RidePhotoResponse>> {
    let photo = state
        .ride_service
        .update_photo(&user, &id, &photo_id, req.caption, req.order)
        .await?;

    let uploader = state.user_service.get(&photo.uploaded_by).await.ok();
    Ok(Json(RidePhotoResponse::new(&photo, uploader.as_ref(), &state.media)))
}

async fn delete_photo(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, photo_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state.ride_service.delete_photo(&user, &id, &photo_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<RideCommentResponse>>> {
    let comments = state.ride_service.list_comments(&id).await?;
    Ok(Json(
        comments
            .iter()
            .map(|(comment, author)| RideCommentResponse::new(comment, author.as_ref()))
            .collect(),
    ))
}

/// Comment request.
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub message: String,
}

async fn add_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<RideCommentResponse>)> {
    let comment = state.ride_service.add_comment(&id, &user, &req.message).await?;
    Ok((
        StatusCode::CREATED,
        Json(RideCommentResponse::new(&comment, Some(&user))),
    ))
}

async fn delete_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state
        .ride_service
        .delete_comment(&user, &id, &comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rides).post(create_ride))
        .route("/upcoming", get(upcoming_ride))
        .route(
            "/{id}",
            get(get_ride)
                .put(update_ride)
                .patch(update_ride)
                .delete(delete_ride),
        )
        .route("/{id}/files", post(upload_ride_files))
        .route("/{id}/join", post(join_ride))
        .route("/{id}/leave", post(leave_ride))
        .route("/{id}/photos", get(list_photos).post(add_photo))
        .route(
            "/{id}/photos/{photo_id}",
            patch(update_photo).delete(delete_photo),
        )
        .route("/{id}/comments", get(list_comments).post(add_comment))
        .route("/{id}/comments/{comment_id}", delete(delete_comment))
}
