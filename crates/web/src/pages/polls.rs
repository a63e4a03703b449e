//! Active poll and voting.

use axum::{
    Form,
    extract::{Path, State},
};
use axum_extra::extract::CookieJar;
use club_api::response::{PollDetailResponse, PollListResponse};
use club_common::AppError;
use serde::Deserialize;

use super::{Page, redirect_with};
use crate::{
    flash::Level,
    session::{Member, Viewer},
    state::WebState,
    templates::PageResult,
};

const POLLS_PATH: &str = "/polls";

#[derive(Debug, Deserialize)]
pub struct VoteForm {
    #[serde(default)]
    choice_id: Option<String>,
}

/// The active poll with its tallies, and earlier polls.
pub async fn index(
    State(state): State<WebState>,
    Viewer(viewer): Viewer,
    jar: CookieJar,
) -> PageResult {
    let polls = &state.app.poll_service;

    let active = match polls.active_poll().await? {
        Some(poll) => {
            let detail = polls.poll_detail(poll, viewer.as_ref()).await?;
            Some(PollDetailResponse::from(&detail))
        }
        None => None,
    };
    let others: Vec<PollListResponse> = polls
        .list_summaries(false)
        .await?
        .iter()
        .filter(|summary| active.as_ref().is_none_or(|poll| poll.id != summary.poll.id))
        .map(PollListResponse::from)
        .collect();

    Page::new(&state, jar, viewer.as_ref()).render("polls.html", |context| {
        context.insert("poll", &active);
        context.insert("other_polls", &others);
    })
}

pub async fn vote(
    State(state): State<WebState>,
    Member(user): Member,
    Path(id): Path<String>,
    jar: CookieJar,
    Form(form): Form<VoteForm>,
) -> PageResult {
    let choice_id = form.choice_id.as_deref().filter(|id| !id.is_empty());

    match state.app.poll_service.cast_vote(&id, choice_id, &user).await {
        Ok(_) => Ok(redirect_with(
            jar,
            Level::Success,
            "Your vote has been recorded.",
            POLLS_PATH,
        )),
        Err(err @ (AppError::BadRequest(_) | AppError::Validation(_))) => Ok(redirect_with(
            jar,
            Level::Error,
            err.public_message(),
            POLLS_PATH,
        )),
        Err(err) => Err(err.into()),
    }
}
