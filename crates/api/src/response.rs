//! API response projections.
//!
//! List projections carry summary counts; detail projections nest users,
//! riders, photos and choices. Stored media keys are resolved to URLs here.

use chrono::{DateTime, FixedOffset, Utc};
use club_core::{
    ChoiceDetail, MediaService, PollDetail, PollSummary, RideDetail, RideSummary, Voter,
};
use club_db::entities::{item, profile, ride, ride_comment, ride_photo, user, vote};
use serde::Serialize;

/// Plain message body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    /// Wrap a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Public member fields.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&user::Model> for UserResponse {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Credentials returned on sign-in.
#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub id: String,
    pub username: String,
    pub token: String,
    pub is_staff: bool,
}

/// Member profile.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub user: UserResponse,
    pub username: String,
    pub avatar: Option<String>,
    pub bike_photo_1: Option<String>,
    pub bike_photo_2: Option<String>,
    pub bike_photo_3: Option<String>,
    pub bio: String,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl ProfileResponse {
    /// Project a profile and its owner.
    #[must_use]
    pub fn new(profile: &profile::Model, user: &user::Model, media: &MediaService) -> Self {
        Self {
            id: profile.id.clone(),
            user: UserResponse::from(user),
            username: user.username.clone(),
            avatar: media.url(profile.avatar.as_deref()),
            bike_photo_1: media.url(profile.bike_photo_1.as_deref()),
            bike_photo_2: media.url(profile.bike_photo_2.as_deref()),
            bike_photo_3: media.url(profile.bike_photo_3.as_deref()),
            bio: profile.bio.clone(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

fn is_upcoming(ride: &ride::Model) -> bool {
    ride.date_time > Utc::now().fixed_offset()
}

/// Ride as listed.
#[derive(Debug, Serialize)]
pub struct RideListResponse {
    pub id: String,
    pub title: String,
    pub date_time: DateTime<FixedOffset>,
    pub start_point: String,
    pub end_point: String,
    pub header_photo: Option<String>,
    pub created_by_username: Option<String>,
    pub rider_count: u64,
    pub is_upcoming: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl RideListResponse {
    /// Project a ride summary.
    #[must_use]
    pub fn new(summary: &RideSummary, media: &MediaService) -> Self {
        let ride = &summary.ride;
        Self {
            id: ride.id.clone(),
            title: ride.title.clone(),
            date_time: ride.date_time,
            start_point: ride.start_point.clone(),
            end_point: ride.end_point.clone(),
            header_photo: media.url(ride.header_photo.as_deref()),
            created_by_username: summary.creator.as_ref().map(|u| u.username.clone()),
            rider_count: summary.rider_count,
            is_upcoming: is_upcoming(ride),
            created_at: ride.created_at,
        }
    }
}

/// Photo in a ride gallery.
#[derive(Debug, Serialize)]
pub struct RidePhotoResponse {
    pub id: String,
    pub photo: Option<String>,
    pub caption: String,
    pub uploaded_by: Option<UserResponse>,
    pub uploaded_by_username: Option<String>,
    pub order: i32,
    pub created_at: DateTime<FixedOffset>,
}

impl RidePhotoResponse {
    /// Project a photo and its uploader.
    #[must_use]
    pub fn new(
        photo: &ride_photo::Model,
        uploader: Option<&user::Model>,
        media: &MediaService,
    ) -> Self {
        Self {
            id: photo.id.clone(),
            photo: media.url(Some(&photo.photo)),
            caption: photo.caption.clone(),
            uploaded_by: uploader.map(UserResponse::from),
            uploaded_by_username: uploader.map(|u| u.username.clone()),
            order: photo.display_order,
            created_at: photo.created_at,
        }
    }
}

/// Ride with everything on it.
#[derive(Debug, Serialize)]
pub struct RideDetailResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date_time: DateTime<FixedOffset>,
    pub header_photo: Option<String>,
    pub calimoto_url: String,
    pub relive_url: String,
    pub start_point: String,
    pub end_point: String,
    pub gpx_file: Option<String>,
    pub created_by: Option<UserResponse>,
    pub riders: Vec<UserResponse>,
    pub photos: Vec<RidePhotoResponse>,
    pub is_upcoming: bool,
    pub completed: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl RideDetailResponse {
    /// Project a loaded ride.
    #[must_use]
    pub fn new(detail: &RideDetail, media: &MediaService) -> Self {
        let ride = &detail.ride;
        Self {
            id: ride.id.clone(),
            title: ride.title.clone(),
            description: ride.description.clone(),
            date_time: ride.date_time,
            header_photo: media.url(ride.header_photo.as_deref()),
            calimoto_url: ride.calimoto_url.clone(),
            relive_url: ride.relive_url.clone(),
            start_point: ride.start_point.clone(),
            end_point: ride.end_point.clone(),
            gpx_file: media.url(ride.gpx_file.as_deref()),
            created_by: detail.creator.as_ref().map(UserResponse::from),
            riders: detail.riders.iter().map(UserResponse::from).collect(),
            photos: detail
                .photos
                .iter()
                .map(|(photo, uploader)| RidePhotoResponse::new(photo, uploader.as_ref(), media))
                .collect(),
            is_upcoming: is_upcoming(ride),
            completed: ride.completed,
            created_at: ride.created_at,
            updated_at: ride.updated_at,
        }
    }
}

/// Comment on a ride.
#[derive(Debug, Serialize)]
pub struct RideCommentResponse {
    pub id: String,
    pub ride_id: String,
    pub user: Option<UserResponse>,
    pub username: Option<String>,
    pub message: String,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl RideCommentResponse {
    /// Project a comment and its author.
    #[must_use]
    pub fn new(comment: &ride_comment::Model, author: Option<&user::Model>) -> Self {
        Self {
            id: comment.id.clone(),
            ride_id: comment.ride_id.clone(),
            user: author.map(UserResponse::from),
            username: author.map(|u| u.username.clone()),
            message: comment.message.clone(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

/// Poll as listed.
#[derive(Debug, Serialize)]
pub struct PollListResponse {
    pub id: String,
    pub title: String,
    pub is_active: bool,
    pub created_by_username: Option<String>,
    pub choice_count: u64,
    pub total_votes: u64,
    pub created_at: DateTime<FixedOffset>,
    pub closes_at: Option<DateTime<FixedOffset>>,
}

impl From<&PollSummary> for PollListResponse {
    fn from(summary: &PollSummary) -> Self {
        Self {
            id: summary.poll.id.clone(),
            title: summary.poll.title.clone(),
            is_active: summary.poll.is_active,
            created_by_username: summary.creator.as_ref().map(|u| u.username.clone()),
            choice_count: summary.choice_count,
            total_votes: summary.total_votes,
            created_at: summary.poll.created_at,
            closes_at: summary.poll.closes_at,
        }
    }
}

/// Member who voted for a choice.
#[derive(Debug, Serialize)]
pub struct VoterResponse {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
}

impl From<&Voter> for VoterResponse {
    fn from(voter: &Voter) -> Self {
        Self {
            id: voter.user.id.clone(),
            username: voter.user.username.clone(),
            avatar: voter.avatar_url.clone(),
        }
    }
}

/// Choice with its tally.
#[derive(Debug, Serialize)]
pub struct PollChoiceResponse {
    pub id: String,
    pub text: String,
    pub description: String,
    pub vote_count: u64,
    pub voters: Vec<VoterResponse>,
    pub percentage: f64,
}

impl From<&ChoiceDetail> for PollChoiceResponse {
    fn from(detail: &ChoiceDetail) -> Self {
        Self {
            id: detail.choice.id.clone(),
            text: detail.choice.text.clone(),
            description: detail.choice.description.clone(),
            vote_count: detail.vote_count,
            voters: detail.voters.iter().map(VoterResponse::from).collect(),
            percentage: detail.percentage,
        }
    }
}

/// Poll with tallies.
#[derive(Debug, Serialize)]
pub struct PollDetailResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub is_active: bool,
    pub created_by: Option<UserResponse>,
    pub choices: Vec<PollChoiceResponse>,
    pub total_votes: u64,
    pub user_vote: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub closes_at: Option<DateTime<FixedOffset>>,
}

impl From<&PollDetail> for PollDetailResponse {
    fn from(detail: &PollDetail) -> Self {
        Self {
            id: detail.poll.id.clone(),
            title: detail.poll.title.clone(),
            description: detail.poll.description.clone(),
            is_active: detail.poll.is_active,
            created_by: detail.creator.as_ref().map(UserResponse::from),
            choices: detail.choices.iter().map(PollChoiceResponse::from).collect(),
            total_votes: detail.total_votes,
            user_vote: detail.user_vote.clone(),
            created_at: detail.poll.created_at,
            closes_at: detail.poll.closes_at,
        }
    }
}

/// A cast vote.
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub id: String,
    pub user: UserResponse,
    pub choice: String,
    pub voted_at: DateTime<FixedOffset>,
}

impl VoteResponse {
    /// Project a vote and its voter.
    #[must_use]
    pub fn new(vote: &vote::Model, voter: &user::Model) -> Self {
        Self {
            id: vote.id.clone(),
            user: UserResponse::from(voter),
            choice: vote.choice_id.clone(),
            voted_at: vote.voted_at,
        }
    }
}

/// Catalogue item.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<item::Model> for ItemResponse {
    fn from(item: item::Model) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}
