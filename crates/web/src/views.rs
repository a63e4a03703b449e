//! Template view models.
//!
//! Pages reuse the API projections and add what only a page needs, such as
//! dates formatted in the club timezone.

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use club_api::response::{ProfileResponse, RideDetailResponse, RideListResponse};
use club_core::{MediaService, RideDetail, RideSummary};
use club_db::entities::{profile, user};
use serde::Serialize;
use tera::Context;

use crate::flash::Flash;

/// Long date shown on ride pages, e.g. "Sunday 4 May 2025, 09:30".
const DISPLAY_FORMAT: &str = "%A %-d %B %Y, %H:%M";
/// Value format of a `datetime-local` input.
const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// The signed-in member as seen by templates.
#[derive(Debug, Serialize)]
pub struct ViewerView {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub is_staff: bool,
}

impl From<&user::Model> for ViewerView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            is_staff: user.is_staff,
        }
    }
}

/// Context every page template starts from.
#[must_use]
pub fn page_context(club_name: &str, viewer: Option<&user::Model>, messages: &[Flash]) -> Context {
    let mut context = Context::new();
    context.insert("club_name", club_name);
    context.insert("user", &viewer.map(ViewerView::from));
    context.insert("messages", messages);
    context
}

fn display_date(dt: &DateTime<FixedOffset>, tz: Tz) -> String {
    dt.with_timezone(&tz).format(DISPLAY_FORMAT).to_string()
}

/// Value for a `datetime-local` input in the club timezone.
#[must_use]
pub fn input_date(dt: &DateTime<FixedOffset>, tz: Tz) -> String {
    dt.with_timezone(&tz).format(INPUT_FORMAT).to_string()
}

/// A ride on its detail or upcoming page.
#[derive(Debug, Serialize)]
pub struct RideView {
    #[serde(flatten)]
    pub ride: RideDetailResponse,
    pub date_display: String,
    pub date_input: String,
    pub rider_count: usize,
    pub is_rider: bool,
}

impl RideView {
    /// Project a loaded ride for `viewer`.
    #[must_use]
    pub fn new(
        detail: &RideDetail,
        viewer: Option<&user::Model>,
        media: &MediaService,
        tz: Tz,
    ) -> Self {
        let is_rider =
            viewer.is_some_and(|user| detail.riders.iter().any(|rider| rider.id == user.id));
        Self {
            ride: RideDetailResponse::new(detail, media),
            date_display: display_date(&detail.ride.date_time, tz),
            date_input: input_date(&detail.ride.date_time, tz),
            rider_count: detail.riders.len(),
            is_rider,
        }
    }
}

/// A ride in a list.
#[derive(Debug, Serialize)]
pub struct RideCardView {
    #[serde(flatten)]
    pub ride: RideListResponse,
    pub date_display: String,
}

impl RideCardView {
    /// Project a ride summary.
    #[must_use]
    pub fn new(summary: &RideSummary, media: &MediaService, tz: Tz) -> Self {
        Self {
            ride: RideListResponse::new(summary, media),
            date_display: display_date(&summary.ride.date_time, tz),
        }
    }
}

/// A member on the members page.
#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub is_staff: bool,
    pub date_joined: String,
    pub profile: Option<ProfileResponse>,
}

impl MemberView {
    /// Project a member and their profile.
    #[must_use]
    pub fn new(
        user: &user::Model,
        profile: Option<&profile::Model>,
        media: &MediaService,
        tz: Tz,
    ) -> Self {
        let full_name = format!("{} {}", user.first_name, user.last_name)
            .trim()
            .to_string();
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            full_name,
            email: user.email.clone(),
            is_staff: user.is_staff,
            date_joined: user.date_joined.with_timezone(&tz).format("%-d %B %Y").to_string(),
            profile: profile.map(|profile| ProfileResponse::new(profile, user, media)),
        }
    }
}
