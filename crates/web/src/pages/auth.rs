//! Login, registration and logout pages.

use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::CookieJar;
use club_common::AppError;
use club_core::RegisterInput;
use serde::Deserialize;

use super::{Page, redirect_with};
use crate::{
    flash::Level,
    session::{self, Viewer},
    state::WebState,
    templates::PageResult,
};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    next: Option<String>,
}

fn next_target(next: Option<&str>) -> &str {
    next.filter(|next| session::is_local_path(next)).unwrap_or("/")
}

pub async fn login_form(
    State(state): State<WebState>,
    Viewer(viewer): Viewer,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
) -> PageResult {
    if viewer.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Page::new(&state, jar, None).render("login.html", |context| {
        context.insert("next", &query.next);
        context.insert("username", "");
    })
}

pub async fn login(
    State(state): State<WebState>,
    Viewer(viewer): Viewer,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> PageResult {
    if viewer.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let next = form.next.or(query.next);
    match state
        .app
        .user_service
        .authenticate(form.username.trim(), &form.password)
        .await
    {
        Ok(user) => {
            let jar = session::start_session(jar, &state.app.config.auth, &user.token);
            Ok(redirect_with(
                jar,
                Level::Success,
                format!("Welcome back, {}!", user.username),
                next_target(next.as_deref()),
            ))
        }
        Err(err @ AppError::InvalidCredentials) => Page::new(&state, jar, None)
            .error(err.public_message())
            .render("login.html", |context| {
                context.insert("next", &next);
                context.insert("username", form.username.trim());
            }),
        Err(err) => Err(err.into()),
    }
}

pub async fn register_form(
    State(state): State<WebState>,
    Viewer(viewer): Viewer,
    jar: CookieJar,
) -> PageResult {
    if viewer.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Page::new(&state, jar, None).render("register.html", |context| {
        insert_register_values(context, &RegisterInput::default());
    })
}

pub async fn register(
    State(state): State<WebState>,
    Viewer(viewer): Viewer,
    jar: CookieJar,
    Form(input): Form<RegisterInput>,
) -> PageResult {
    if viewer.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    match state.app.user_service.register(input.clone()).await {
        Ok(user) => {
            let jar = session::start_session(jar, &state.app.config.auth, &user.token);
            Ok(redirect_with(
                jar,
                Level::Success,
                format!("Welcome to {}, {}!", state.app.config.club.name, user.username),
                "/profile/edit",
            ))
        }
        Err(err) if !err.is_server_error() => Page::new(&state, jar, None)
            .error(err.public_message())
            .render("register.html", |context| insert_register_values(context, &input)),
        Err(err) => Err(err.into()),
    }
}

fn insert_register_values(context: &mut tera::Context, input: &RegisterInput) {
    context.insert("username", &input.username);
    context.insert("email", &input.email);
    context.insert("first_name", &input.first_name);
    context.insert("last_name", &input.last_name);
}

/// Sign out on any method. Rotating the token ends every other session too.
pub async fn logout(
    State(state): State<WebState>,
    Viewer(viewer): Viewer,
    jar: CookieJar,
) -> PageResult {
    if let Some(user) = viewer {
        state.app.user_service.rotate_token(&user.id).await?;
        tracing::debug!(user_id = %user.id, "Signed out");
    }

    let jar = session::end_session(jar, &state.app.config.auth);
    Ok(redirect_with(
        jar,
        Level::Success,
        "You have been logged out successfully.",
        "/",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_target() {
        assert_eq!(next_target(Some("/rides/abc")), "/rides/abc");
        assert_eq!(next_target(Some("https://evil.example/")), "/");
        assert_eq!(next_target(Some("//evil.example")), "/");
        assert_eq!(next_target(None), "/");
    }
}
