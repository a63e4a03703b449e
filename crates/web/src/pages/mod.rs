//! Page routes.

mod auth;
mod home;
mod members;
mod polls;
mod profile;
mod rides;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{any, get, post},
};
use axum_extra::extract::CookieJar;
use club_db::entities::user;
use tera::Context;

use crate::{
    flash::{self, Flash, Level},
    state::WebState,
    templates::PageResult,
    views::page_context,
};

/// Create the page router.
pub fn router() -> Router<WebState> {
    Router::new()
        .route("/", get(home::index))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/logout", any(auth::logout))
        .route("/profile/edit", get(profile::edit_form).post(profile::edit))
        .route("/rides", get(rides::list))
        .route("/rides/add", get(rides::add_form).post(rides::add))
        .route("/rides/{id}", get(rides::detail))
        .route("/rides/{id}/edit", get(rides::edit_form).post(rides::edit))
        .route("/rides/{id}/join", any(rides::join))
        .route("/rides/{id}/leave", any(rides::leave))
        .route("/rides/{id}/complete", any(rides::complete))
        .route("/upcoming-ride", get(rides::upcoming))
        .route("/polls", get(polls::index))
        .route("/polls/{id}/vote", post(polls::vote))
        .route("/members", get(members::list))
        .route("/members/add", get(members::add_form).post(members::add))
        .route("/members/{id}/delete", any(members::delete))
}

/// A page about to be rendered.
///
/// Collects the queued flash messages, so rendering clears the flash cookie.
pub(crate) struct Page<'a> {
    state: &'a WebState,
    jar: CookieJar,
    viewer: Option<&'a user::Model>,
    messages: Vec<Flash>,
    status: StatusCode,
}

impl<'a> Page<'a> {
    pub(crate) fn new(state: &'a WebState, jar: CookieJar, viewer: Option<&'a user::Model>) -> Self {
        let (jar, messages) = flash::take(jar);
        Self {
            state,
            jar,
            viewer,
            messages,
            status: StatusCode::OK,
        }
    }

    /// Show an error above the form being re-rendered.
    pub(crate) fn error(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Flash::new(Level::Error, text));
        self
    }

    pub(crate) fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub(crate) fn render(self, template: &str, fill: impl FnOnce(&mut Context)) -> PageResult {
        let mut context = page_context(
            &self.state.app.config.club.name,
            self.viewer,
            &self.messages,
        );
        fill(&mut context);
        let html = self.state.templates.render(template, &context)?;
        Ok((self.status, self.jar, html).into_response())
    }

    /// The 404 page.
    pub(crate) fn not_found(self, message: &str) -> PageResult {
        self.status(StatusCode::NOT_FOUND)
            .render("error.html", |context| {
                context.insert("title", "Not found");
                context.insert("message", message);
            })
    }
}

/// Redirect with a message for the next page.
pub(crate) fn redirect_with(jar: CookieJar, level: Level, text: impl Into<String>, to: &str) -> Response {
    (flash::push(jar, level, text), Redirect::to(to)).into_response()
}
