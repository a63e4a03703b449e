//! One-shot messages carried to the next page in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

/// Name of the flash cookie.
pub const FLASH_COOKIE: &str = "club_flash";

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub text: String,
}

impl Flash {
    /// Create a message.
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

fn pending(jar: &CookieJar) -> Vec<Flash> {
    jar.get(FLASH_COOKIE)
        .and_then(|cookie| urlencoding::decode(cookie.value()).ok())
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

/// Queue a message for the next page.
#[must_use]
pub fn push(jar: CookieJar, level: Level, text: impl Into<String>) -> CookieJar {
    let mut messages = pending(&jar);
    messages.push(Flash::new(level, text));

    let Ok(json) = serde_json::to_string(&messages) else {
        return jar;
    };
    jar.add(
        Cookie::build((FLASH_COOKIE, urlencoding::encode(&json).into_owned()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Take every queued message, clearing the cookie.
#[must_use]
pub fn take(jar: CookieJar) -> (CookieJar, Vec<Flash>) {
    let messages = pending(&jar);
    if jar.get(FLASH_COOKIE).is_none() {
        return (jar, messages);
    }
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_then_take() {
        let jar = push(CookieJar::new(), Level::Success, "Welcome back, marta!");
        let jar = push(jar, Level::Error, "Invalid \"quoted\"; value");

        let (_, messages) = take(jar);
        assert_eq!(
            messages,
            vec![
                Flash::new(Level::Success, "Welcome back, marta!"),
                Flash::new(Level::Error, "Invalid \"quoted\"; value"),
            ]
        );
    }

    #[test]
    fn test_take_ignores_garbage() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, "not-json"));
        let (_, messages) = take(jar);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_take_without_cookie() {
        let (_, messages) = take(CookieJar::new());
        assert!(messages.is_empty());
    }
}
