//! Member directory and staff member management.

use axum::{
    Form, Json,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use club_core::NewMemberInput;
use serde_json::json;

use super::{Page, redirect_with};
use crate::{
    flash::Level,
    session::{StaffMember, Viewer},
    state::WebState,
    templates::PageResult,
    views::MemberView,
};

pub async fn list(
    State(state): State<WebState>,
    Viewer(viewer): Viewer,
    jar: CookieJar,
) -> PageResult {
    let app = &state.app;
    let members: Vec<MemberView> = app
        .user_service
        .list_members()
        .await?
        .iter()
        .map(|(user, profile)| MemberView::new(user, profile.as_ref(), &app.media, app.timezone))
        .collect();

    Page::new(&state, jar, viewer.as_ref()).render("members_list.html", |context| {
        context.insert("members", &members);
    })
}

fn insert_member_values(context: &mut tera::Context, input: &NewMemberInput) {
    context.insert("username", &input.username);
    context.insert("email", &input.email);
    context.insert("first_name", &input.first_name);
    context.insert("last_name", &input.last_name);
}

pub async fn add_form(
    State(state): State<WebState>,
    StaffMember(user): StaffMember,
    jar: CookieJar,
) -> PageResult {
    Page::new(&state, jar, Some(&user)).render("member_add.html", |context| {
        insert_member_values(context, &NewMemberInput::default());
    })
}

pub async fn add(
    State(state): State<WebState>,
    StaffMember(user): StaffMember,
    jar: CookieJar,
    Form(input): Form<NewMemberInput>,
) -> PageResult {
    match state.app.user_service.create_member(&user, input.clone()).await {
        Ok(member) => Ok(redirect_with(
            jar,
            Level::Success,
            format!("Rider \"{}\" has been added successfully!", member.username),
            "/members",
        )),
        Err(err) if !err.is_server_error() => Page::new(&state, jar, Some(&user))
            .error(err.public_message())
            .render("member_add.html", |context| insert_member_values(context, &input)),
        Err(err) => Err(err.into()),
    }
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Delete a member. Answers in JSON for the members page script.
pub async fn delete(
    State(state): State<WebState>,
    StaffMember(user): StaffMember,
    method: Method,
    Path(id): Path<String>,
) -> Response {
    if method != Method::POST {
        return json_error(StatusCode::BAD_REQUEST, "Invalid request method.");
    }

    match state.app.user_service.delete_member(&user, &id).await {
        Ok(member) => Json(json!({
            "message": format!("Rider \"{}\" has been deleted successfully.", member.username),
        }))
        .into_response(),
        Err(err) => {
            if err.is_server_error() {
                tracing::error!(error = %err, member_id = %id, "Failed to delete member");
            }
            json_error(err.status_code(), &err.public_message())
        }
    }
}

