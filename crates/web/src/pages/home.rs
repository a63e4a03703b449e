//! Landing page.

use axum::extract::State;
use axum_extra::extract::CookieJar;
use chrono::Utc;
use club_api::response::PollDetailResponse;

use super::Page;
use crate::{session::Viewer, state::WebState, templates::PageResult, views::RideView};

/// Home page with the upcoming ride and the active poll.
pub async fn index(
    State(state): State<WebState>,
    Viewer(viewer): Viewer,
    jar: CookieJar,
) -> PageResult {
    let app = &state.app;

    let ride = match app.ride_service.upcoming(Utc::now().fixed_offset()).await? {
        Some(ride) => {
            let detail = app.ride_service.detail(ride).await?;
            Some(RideView::new(&detail, viewer.as_ref(), &app.media, app.timezone))
        }
        None => None,
    };

    let poll = match app.poll_service.active_poll().await? {
        Some(poll) => {
            let detail = app.poll_service.poll_detail(poll, viewer.as_ref()).await?;
            Some(PollDetailResponse::from(&detail))
        }
        None => None,
    };

    Page::new(&state, jar, viewer.as_ref()).render("home.html", |context| {
        context.insert("ride", &ride);
        context.insert("poll", &poll);
    })
}
