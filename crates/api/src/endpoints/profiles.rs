//! Profile endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use club_common::{AppError, AppResult};
use club_core::{ProfileImage, UpdateProfileInput};
use club_db::entities::{profile, user};
use serde::Deserialize;

use crate::{
    extractors::AuthUser, middleware::AppState, multipart::MultipartForm,
    response::ProfileResponse,
};

/// Profile list filter.
#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub username: Option<String>,
}

async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> AppResult<Json<Vec<ProfileResponse>>> {
    let profiles = state
        .profile_service
        .list(query.username.as_deref())
        .await?;

    Ok(Json(
        profiles
            .iter()
            .map(|(profile, user)| ProfileResponse::new(profile, user, &state.media))
            .collect(),
    ))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ProfileResponse>> {
    let (profile, user) = state.profile_service.get_with_user(&id).await?;
    Ok(Json(ProfileResponse::new(&profile, &user, &state.media)))
}

/// Load a profile the actor may change.
async fn owned_profile(
    state: &AppState,
    actor: &user::Model,
    id: &str,
) -> AppResult<(profile::Model, user::Model)> {
    let (profile, owner) = state.profile_service.get_with_user(id).await?;
    if owner.id != actor.id && !actor.is_staff {
        return Err(AppError::Forbidden(
            "You can only change your own profile.".to_string(),
        ));
    }
    Ok((profile, owner))
}

async fn update_profile(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<Json<ProfileResponse>> {
    let (profile, owner) = owned_profile(&state, &actor, &id).await?;
    let profile = state.profile_service.update_profile(profile, input).await?;
    Ok(Json(ProfileResponse::new(&profile, &owner, &state.media)))
}

async fn delete_profile(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let (profile, _) = owned_profile(&state, &actor, &id).await?;
    state.profile_service.delete(profile).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn my_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = state.profile_service.ensure_profile(&user.id).await?;
    Ok(Json(ProfileResponse::new(&profile, &user, &state.media)))
}

async fn update_my_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = state.profile_service.ensure_profile(&user.id).await?;
    let profile = state.profile_service.update_profile(profile, input).await?;
    Ok(Json(ProfileResponse::new(&profile, &user, &state.media)))
}

/// Upload any of `avatar`, `bike_photo_1`, `bike_photo_2`, `bike_photo_3`.
async fn upload_my_images(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<ProfileResponse>> {
    let mut form = MultipartForm::read(multipart).await?;
    let profile = state.profile_service.ensure_profile(&user.id).await?;
    let images = ProfileImage::ALL
        .into_iter()
        .filter_map(|slot| form.take_file(slot.field_name()).map(|upload| (slot, upload)))
        .collect();

    let profile = state
        .profile_service
        .save_profile(profile, UpdateProfileInput::default(), images)
        .await?;

    Ok(Json(ProfileResponse::new(&profile, &user, &state.media)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_profiles))
        .route(
            "/me",
            get(my_profile).put(update_my_profile).patch(update_my_profile),
        )
        .route("/me/images", post(upload_my_images))
        .route(
            "/{id}",
            get(get_profile)
                .put(update_profile)
                .patch(update_profile)
                .delete(delete_profile),
        )
}
