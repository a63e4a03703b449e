//! Embedded page templates.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use club_common::{AppError, AppResult};
use tera::{Context, Tera};

/// Every template, compiled into the binary.
const TEMPLATES: [(&str, &str); 13] = [
    ("base.html", include_str!("../templates/base.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("register.html", include_str!("../templates/register.html")),
    ("profile_edit.html", include_str!("../templates/profile_edit.html")),
    ("rides_list.html", include_str!("../templates/rides_list.html")),
    ("ride_detail.html", include_str!("../templates/ride_detail.html")),
    ("upcoming_ride.html", include_str!("../templates/upcoming_ride.html")),
    ("ride_form.html", include_str!("../templates/ride_form.html")),
    ("polls.html", include_str!("../templates/polls.html")),
    ("members_list.html", include_str!("../templates/members_list.html")),
    ("member_add.html", include_str!("../templates/member_add.html")),
    ("error.html", include_str!("../templates/error.html")),
];

/// Template renderer.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Compile the embedded templates.
    pub fn new() -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)
            .map_err(|e| AppError::Template(format!("Failed to compile templates: {e}")))?;
        Ok(Self { tera })
    }

    /// Render a template to an HTML string.
    pub fn render(&self, name: &str, context: &Context) -> AppResult<Html<String>> {
        self.tera
            .render(name, context)
            .map(Html)
            .map_err(|e| AppError::Template(format!("{name}: {e:?}")))
    }
}

/// An error raised while producing a page.
///
/// Rendered as a bare HTML page so it works even when templates fail.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if self.0.is_server_error() {
            tracing::error!(error = %self.0, "Page failed");
        } else {
            tracing::debug!(error = %self.0, "Page request rejected");
        }

        let body = format!(
            "<!DOCTYPE html><html><head><title>{code}</title></head>\
             <body><h1>{code}</h1><p>{message}</p><p><a href=\"/\">Home</a></p></body></html>",
            code = status.as_u16(),
            message = tera::escape_html(&self.0.public_message()),
        );
        (status, Html(body)).into_response()
    }
}

/// Result of a page handler.
pub type PageResult<T = Response> = Result<T, PageError>;
