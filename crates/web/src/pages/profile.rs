//! Editing the signed-in member's profile.

use axum::extract::{Multipart, State};
use axum_extra::extract::CookieJar;
use club_api::{multipart::MultipartForm, response::ProfileResponse};
use club_common::AppResult;
use club_core::{ProfileImage, UpdateProfileInput};
use club_db::entities::{profile, user};

use super::{Page, redirect_with};
use crate::{flash::Level, session::Member, state::WebState, templates::PageResult};

const EDIT_PATH: &str = "/profile/edit";

pub async fn edit_form(
    State(state): State<WebState>,
    Member(user): Member,
    jar: CookieJar,
) -> PageResult {
    let app = &state.app;
    let profile = app.profile_service.ensure_profile(&user.id).await?;
    let profile = ProfileResponse::new(&profile, &user, &app.media);

    Page::new(&state, jar, Some(&user)).render("profile_edit.html", |context| {
        context.insert("profile", &profile);
        context.insert("slots", &ProfileImage::ALL.map(ProfileImage::field_name));
    })
}

pub async fn edit(
    State(state): State<WebState>,
    Member(user): Member,
    jar: CookieJar,
    multipart: Multipart,
) -> PageResult {
    let form = MultipartForm::read(multipart).await?;

    match save_profile(&state, &user, form).await {
        Ok(profile) => {
            tracing::info!(profile_id = %profile.id, user_id = %user.id, "Profile updated");
            Ok(redirect_with(
                jar,
                Level::Success,
                "Your profile has been updated successfully!",
                EDIT_PATH,
            ))
        }
        Err(err) if !err.is_server_error() => Ok(redirect_with(
            jar,
            Level::Error,
            err.public_message(),
            EDIT_PATH,
        )),
        Err(err) => Err(err.into()),
    }
}

async fn save_profile(
    state: &WebState,
    user: &user::Model,
    mut form: MultipartForm,
) -> AppResult<profile::Model> {
    let profiles = &state.app.profile_service;
    let profile = profiles.ensure_profile(&user.id).await?;

    let input = UpdateProfileInput {
        bio: form.text_owned("bio"),
    };
    let images = ProfileImage::ALL
        .into_iter()
        .filter_map(|slot| form.take_file(slot.field_name()).map(|upload| (slot, upload)))
        .collect();

    profiles.save_profile(profile, input, images).await
}
