//! Ride pages: listings, the upcoming ride, the ride form and membership actions.

use axum::{
    extract::{Multipart, Path, State},
    http::Method,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use club_api::{multipart::MultipartForm, response::RideCommentResponse};
use club_common::{AppError, AppResult};
use club_core::{RideFiles, RideInput, Upload};
use club_db::{
    entities::{ride, user},
    repositories::RideFilter,
};
use serde::Serialize;

use super::{Page, redirect_with};
use crate::{
    flash::Level,
    session::{Member, StaffMember, Viewer},
    state::WebState,
    templates::PageResult,
    views::{RideCardView, RideView, input_date},
};

const UPCOMING_PATH: &str = "/upcoming-ride";
const RIDE_NOT_FOUND: &str = "The ride you are looking for does not exist.";

/// Values shown in the ride form.
#[derive(Debug, Default, Serialize)]
struct RideFormValues {
    id: Option<String>,
    title: String,
    description: String,
    date_time: String,
    start_point: String,
    end_point: String,
    calimoto_url: String,
    relive_url: String,
}

impl RideFormValues {
    fn from_ride(ride: &ride::Model, tz: chrono_tz::Tz) -> Self {
        Self {
            id: Some(ride.id.clone()),
            title: ride.title.clone(),
            description: ride.description.clone(),
            date_time: input_date(&ride.date_time, tz),
            start_point: ride.start_point.clone(),
            end_point: ride.end_point.clone(),
            calimoto_url: ride.calimoto_url.clone(),
            relive_url: ride.relive_url.clone(),
        }
    }

    fn from_input(id: Option<String>, input: &RideInput) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            id,
            title: text(&input.title),
            description: text(&input.description),
            date_time: text(&input.date_time),
            start_point: text(&input.start_point),
            end_point: text(&input.end_point),
            calimoto_url: text(&input.calimoto_url),
            relive_url: text(&input.relive_url),
        }
    }
}

/// Uploads and text fields of a submitted ride form.
struct RideSubmission {
    input: RideInput,
    header_photo: Option<Upload>,
    gpx_file: Option<Upload>,
}

impl RideSubmission {
    async fn read(multipart: Multipart) -> AppResult<Self> {
        let mut form = MultipartForm::read(multipart).await?;
        Ok(Self {
            input: RideInput {
                title: form.text_owned("title"),
                description: form.text_owned("description"),
                date_time: form.text_owned("date_time"),
                start_point: form.text_owned("start_point"),
                end_point: form.text_owned("end_point"),
                calimoto_url: form.text_owned("calimoto_url"),
                relive_url: form.text_owned("relive_url"),
                completed: None,
                rider_ids: None,
            },
            header_photo: form.take_file("header_photo"),
            gpx_file: form.take_file("gpx_file"),
        })
    }

    fn files(&self) -> RideFiles<'_> {
        RideFiles {
            header_photo: self.header_photo.as_ref(),
            gpx_file: self.gpx_file.as_ref(),
        }
    }
}

/// Completed rides, newest first.
pub async fn list(
    State(state): State<WebState>,
    Viewer(viewer): Viewer,
    jar: CookieJar,
) -> PageResult {
    let app = &state.app;
    let rides: Vec<RideCardView> = app
        .ride_service
        .list_summaries(RideFilter {
            completed: Some(true),
            ..RideFilter::default()
        })
        .await?
        .iter()
        .map(|summary| RideCardView::new(summary, &app.media, app.timezone))
        .collect();

    Page::new(&state, jar, viewer.as_ref()).render("rides_list.html", |context| {
        context.insert("rides", &rides);
    })
}

pub async fn detail(
    State(state): State<WebState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
    jar: CookieJar,
) -> PageResult {
    let app = &state.app;
    let ride = match app.ride_service.get(&id).await {
        Ok(ride) => ride,
        Err(AppError::RideNotFound(_)) => {
            return Page::new(&state, jar, viewer.as_ref()).not_found(RIDE_NOT_FOUND);
        }
        Err(err) => return Err(err.into()),
    };

    let comments: Vec<RideCommentResponse> = app
        .ride_service
        .list_comments(&ride.id)
        .await?
        .iter()
        .map(|(comment, author)| RideCommentResponse::new(comment, author.as_ref()))
        .collect();
    let detail = app.ride_service.detail(ride).await?;
    let ride = RideView::new(&detail, viewer.as_ref(), &app.media, app.timezone);

    Page::new(&state, jar, viewer.as_ref()).render("ride_detail.html", |context| {
        context.insert("ride", &ride);
        context.insert("comments", &comments);
    })
}

/// The ride members should look at next.
pub async fn upcoming(
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

    Page::new(&state, jar, viewer.as_ref()).render("upcoming_ride.html", |context| {
        context.insert("ride", &ride);
    })
}

fn render_form(
    state: &WebState,
    jar: CookieJar,
    user: &user::Model,
    values: &RideFormValues,
    error: Option<String>,
) -> PageResult {
    let mut page = Page::new(state, jar, Some(user));
    if let Some(error) = error {
        page = page.error(error);
    }
    page.render("ride_form.html", |context| {
        context.insert("edit_mode", &values.id.is_some());
        context.insert("ride", values);
    })
}

pub async fn add_form(
    State(state): State<WebState>,
    StaffMember(user): StaffMember,
    jar: CookieJar,
) -> PageResult {
    render_form(&state, jar, &user, &RideFormValues::default(), None)
}

pub async fn add(
    State(state): State<WebState>,
    StaffMember(user): StaffMember,
    jar: CookieJar,
    multipart: Multipart,
) -> PageResult {
    let submission = RideSubmission::read(multipart).await?;
    let values = RideFormValues::from_input(None, &submission.input);

    let created = state
        .app
        .ride_service
        .create_ride_with_files(&user, submission.input.clone(), submission.files())
        .await;

    match created {
        Ok(ride) => Ok(redirect_with(
            jar,
            Level::Success,
            format!("Ride \"{}\" has been created successfully!", ride.title),
            UPCOMING_PATH,
        )),
        Err(err) if !err.is_server_error() => {
            render_form(&state, jar, &user, &values, Some(err.public_message()))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn edit_form(
    State(state): State<WebState>,
    StaffMember(user): StaffMember,
    Path(id): Path<String>,
    jar: CookieJar,
) -> PageResult {
    let ride = match state.app.ride_service.get(&id).await {
        Ok(ride) => ride,
        Err(AppError::RideNotFound(_)) => {
            return Page::new(&state, jar, Some(&user)).not_found(RIDE_NOT_FOUND);
        }
        Err(err) => return Err(err.into()),
    };

    let values = RideFormValues::from_ride(&ride, state.app.timezone);
    render_form(&state, jar, &user, &values, None)
}

pub async fn edit(
    State(state): State<WebState>,
    StaffMember(user): StaffMember,
    Path(id): Path<String>,
    jar: CookieJar,
    multipart: Multipart,
) -> PageResult {
    let mut submission = RideSubmission::read(multipart).await?;
    // Route links are cleared when left out of the form.
    submission.input.calimoto_url.get_or_insert_with(String::new);
    submission.input.relive_url.get_or_insert_with(String::new);

    let updated = state
        .app
        .ride_service
        .edit_ride_with_files(&user, &id, submission.input.clone(), submission.files())
        .await;

    match updated {
        Ok(ride) => Ok(redirect_with(
            jar,
            Level::Success,
            format!("Ride \"{}\" has been updated successfully!", ride.title),
            UPCOMING_PATH,
        )),
        Err(AppError::RideNotFound(_)) => {
            Page::new(&state, jar, Some(&user)).not_found(RIDE_NOT_FOUND)
        }
        Err(err) if !err.is_server_error() => {
            let ride = state.app.ride_service.get(&id).await?;
            let values = RideFormValues::from_ride(&ride, state.app.timezone);
            render_form(&state, jar, &user, &values, Some(err.public_message()))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn join(
    State(state): State<WebState>,
    Member(user): Member,
    method: Method,
    Path(id): Path<String>,
    jar: CookieJar,
) -> PageResult {
    if method != Method::POST {
        return Ok(Redirect::to(UPCOMING_PATH).into_response());
    }

    let ride = state.app.ride_service.join(&id, &user).await?;
    Ok(redirect_with(
        jar,
        Level::Success,
        format!("You have joined \"{}\"!", ride.title),
        UPCOMING_PATH,
    ))
}

pub async fn leave(
    State(state): State<WebState>,
    Member(user): Member,
    method: Method,
    Path(id): Path<String>,
    jar: CookieJar,
) -> PageResult {
    if method != Method::POST {
        return Ok(Redirect::to(UPCOMING_PATH).into_response());
    }

    let ride = state.app.ride_service.leave(&id, &user).await?;
    Ok(redirect_with(
        jar,
        Level::Success,
        format!("You have left \"{}\".", ride.title),
        UPCOMING_PATH,
    ))
}

pub async fn complete(
    State(state): State<WebState>,
    StaffMember(user): StaffMember,
    method: Method,
    Path(id): Path<String>,
    jar: CookieJar,
) -> PageResult {
    if method != Method::POST {
        return Ok(Redirect::to(UPCOMING_PATH).into_response());
    }

    let ride = state.app.ride_service.mark_complete(&user, &id).await?;
    Ok(redirect_with(
        jar,
        Level::Success,
        format!("Ride \"{}\" has been marked as completed!", ride.title),
        UPCOMING_PATH,
    ))
}
