//! Session cookie and page access control.
//!
//! The session cookie holds the member's access token; the API auth
//! middleware resolves it for every request.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use club_common::config::AuthConfig;
use club_db::entities::user;

use crate::flash::{self, Level};

/// The member viewing a page, if signed in.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<user::Model>);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// A signed-in member. Anonymous visitors are sent to the login page.
#[derive(Debug, Clone)]
pub struct Member(pub user::Model);

impl<S> FromRequestParts<S> for Member
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(Member)
            .ok_or_else(|| login_redirect(&requested_path(parts)))
    }
}

/// A signed-in staff member. Everyone else is sent to the login page with
/// an error message.
#[derive(Debug, Clone)]
pub struct StaffMember(pub user::Model);

impl<S> FromRequestParts<S> for StaffMember
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<user::Model>() {
            Some(user) if user.is_staff => Ok(Self(user.clone())),
            _ => {
                let jar = flash::push(
                    CookieJar::from_headers(&parts.headers),
                    Level::Error,
                    "Only staff members can do this.",
                );
                Err((jar, login_redirect(&requested_path(parts))).into_response())
            }
        }
    }
}

fn requested_path(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0);
    uri.path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string)
}

/// Redirect to the login page, coming back to `next` afterwards.
#[must_use]
pub fn login_redirect(next: &str) -> Redirect {
    Redirect::to(&format!("/login?next={}", urlencoding::encode(next)))
}

/// Whether a `next` target stays on this site.
#[must_use]
pub fn is_local_path(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')
}

/// Attach the session cookie for a signed-in member.
#[must_use]
pub fn start_session(jar: CookieJar, auth: &AuthConfig, token: &str) -> CookieJar {
    jar.add(
        Cookie::build((auth.cookie_name.clone(), token.to_string()))
            .path("/")
            .http_only(true)
            .secure(auth.cookie_secure)
            .same_site(SameSite::Lax),
    )
}

/// Drop the session cookie.
#[must_use]
pub fn end_session(jar: CookieJar, auth: &AuthConfig) -> CookieJar {
    jar.remove(Cookie::build(auth.cookie_name.clone()).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_local_path() {
        assert!(is_local_path("/rides/abc"));
        assert!(is_local_path("/upcoming-ride?x=1"));
        assert!(!is_local_path("https://evil.example"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("/\\evil.example"));
        assert!(!is_local_path(""));
    }

    #[test]
    fn test_session_cookie_roundtrip() {
        let auth = AuthConfig::default();
        let jar = start_session(CookieJar::new(), &auth, "tok");
        assert_eq!(jar.get(&auth.cookie_name).map(Cookie::value), Some("tok"));

        let jar = end_session(jar, &auth);
        assert!(jar.get(&auth.cookie_name).is_none());
    }
}
