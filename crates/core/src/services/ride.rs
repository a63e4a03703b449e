//! Ride management service.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use club_common::{AppError, AppResult, IdGenerator, MediaCategory};
use club_db::{
    entities::{ride, ride_comment, ride_photo, user},
    repositories::{
        RideCommentRepository, RideFilter, RidePhotoRepository, RideRepository, UserRepository,
    },
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::media::{MediaService, Upload};
use super::user::require_staff;

const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields.";

/// Input for creating or editing a ride.
///
/// On edit every absent field keeps its stored value.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct RideInput {
    #[validate(length(max = 200, message = "Title must be at most 200 characters."))]
    pub title: Option<String>,

    pub description: Option<String>,

    /// RFC 3339, or a local `YYYY-MM-DDTHH:MM` time in the club timezone.
    pub date_time: Option<String>,

    #[validate(length(max = 300, message = "Start point must be at most 300 characters."))]
    pub start_point: Option<String>,

    #[validate(length(max = 300, message = "End point must be at most 300 characters."))]
    pub end_point: Option<String>,

    pub calimoto_url: Option<String>,

    pub relive_url: Option<String>,

    pub completed: Option<bool>,

    /// Replaces the rider set when present.
    pub rider_ids: Option<Vec<String>>,
}

/// A ride as shown in lists.
#[derive(Debug, Clone)]
pub struct RideSummary {
    pub ride: ride::Model,
    pub creator: Option<user::Model>,
    pub rider_count: u64,
}

/// A ride with everything its detail view shows.
#[derive(Debug, Clone)]
pub struct RideDetail {
    pub ride: ride::Model,
    pub creator: Option<user::Model>,
    pub riders: Vec<user::Model>,
    pub photos: Vec<(ride_photo::Model, Option<user::Model>)>,
}

/// Files uploaded with a ride form.
#[derive(Debug, Clone, Copy, Default)]
pub struct RideFiles<'a> {
    pub header_photo: Option<&'a Upload>,
    pub gpx_file: Option<&'a Upload>,
}

/// Storage keys of ride files.
#[derive(Debug, Default)]
struct StagedFiles {
    header_photo: Option<String>,
    gpx_file: Option<String>,
}

/// Ride service for business logic.
#[derive(Clone)]
pub struct RideService {
    ride_repo: RideRepository,
    photo_repo: RidePhotoRepository,
    comment_repo: RideCommentRepository,
    user_repo: UserRepository,
    media: MediaService,
    tz: Tz,
    id_gen: IdGenerator,
}

impl RideService {
    /// Create a new ride service.
    #[must_use]
    pub const fn new(
        ride_repo: RideRepository,
        photo_repo: RidePhotoRepository,
        comment_repo: RideCommentRepository,
        user_repo: UserRepository,
        media: MediaService,
        tz: Tz,
    ) -> Self {
        Self {
            ride_repo,
            photo_repo,
            comment_repo,
            user_repo,
            media,
            tz,
            id_gen: IdGenerator::new(),
        }
    }

    /// Parse a ride start time.
    ///
    /// Accepts RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` (a space also
    /// separates date and time) read as club local time.
    pub fn parse_start_time(&self, text: &str) -> AppResult<DateTime<FixedOffset>> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(dt.with_timezone(&Utc).fixed_offset());
        }

        let naive = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .ok_or_else(|| {
                AppError::Validation(format!("Enter a valid date/time, got \"{text}\"."))
            })?;

        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc).fixed_offset())
            .ok_or_else(|| {
                AppError::Validation(format!("\"{text}\" does not exist in the club timezone."))
            })
    }

    /// Get a ride by ID.
    pub async fn get(&self, id: &str) -> AppResult<ride::Model> {
        self.ride_repo.get_by_id(id).await
    }

    /// List rides, newest start first.
    pub async fn list_rides(&self, filter: RideFilter) -> AppResult<Vec<ride::Model>> {
        self.ride_repo.find_all(filter).await
    }

    /// List rides with creator and rider counts.
    pub async fn list_summaries(&self, filter: RideFilter) -> AppResult<Vec<RideSummary>> {
        let rides = self.ride_repo.find_all(filter).await?;
        self.summarize(rides).await
    }

    async fn summarize(&self, rides: Vec<ride::Model>) -> AppResult<Vec<RideSummary>> {
        let ids: Vec<String> = rides.iter().map(|r| r.id.clone()).collect();
        let counts = self.ride_repo.count_riders_for(&ids).await?;

        let creator_ids: Vec<String> = rides
            .iter()
            .filter_map(|r| r.created_by.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let creators: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&creator_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(rides
            .into_iter()
            .map(|ride| RideSummary {
                rider_count: counts.get(&ride.id).copied().unwrap_or(0),
                creator: ride.created_by.as_ref().and_then(|id| creators.get(id).cloned()),
                ride,
            })
            .collect())
    }

    /// Load a ride with creator, riders and photos.
    pub async fn detail(&self, ride: ride::Model) -> AppResult<RideDetail> {
        let creator = match &ride.created_by {
            Some(id) => self.user_repo.find_by_id(id).await?,
            None => None,
        };
        let riders = self.ride_repo.find_riders(&ride).await?;
        let photos = self.photo_repo.find_by_ride(&ride.id).await?;

        Ok(RideDetail {
            ride,
            creator,
            riders,
            photos,
        })
    }

    /// Resolve the ride shown as "upcoming".
    ///
    /// The earliest incomplete ride that starts after `now`; failing that, the
    /// incomplete ride with the latest start.
    pub async fn upcoming(&self, now: DateTime<FixedOffset>) -> AppResult<Option<ride::Model>> {
        if let Some(ride) = self.ride_repo.find_next_incomplete(now).await? {
            return Ok(Some(ride));
        }
        self.ride_repo.find_latest_incomplete().await
    }

    /// Riders of a ride, ordered by username.
    pub async fn riders(&self, ride: &ride::Model) -> AppResult<Vec<user::Model>> {
        self.ride_repo.find_riders(ride).await
    }

    /// Number of riders of a ride.
    pub async fn rider_count(&self, ride_id: &str) -> AppResult<u64> {
        self.ride_repo.count_riders(ride_id).await
    }

    /// Whether a user rides along.
    pub async fn is_rider(&self, ride_id: &str, user_id: &str) -> AppResult<bool> {
        self.ride_repo.is_rider(ride_id, user_id).await
    }

    /// Create a ride. The creator is always the acting member.
    pub async fn create_ride(
        &self,
        creator: &user::Model,
        input: RideInput,
    ) -> AppResult<ride::Model> {
        self.create_ride_with_files(creator, input, RideFiles::default())
            .await
    }

    /// Create a ride together with its header photo and GPX route.
    ///
    /// Nothing is stored unless every field and file is valid, and the ride
    /// and its riders commit together.
    pub async fn create_ride_with_files(
        &self,
        creator: &user::Model,
        input: RideInput,
        files: RideFiles<'_>,
    ) -> AppResult<ride::Model> {
        input.validate()?;

        let title = required(input.title.as_deref())?;
        let description = required(input.description.as_deref())?;
        let date_time = required(input.date_time.as_deref())?;
        let start_point = required(input.start_point.as_deref())?;
        let end_point = required(input.end_point.as_deref())?;
        let date_time = self.parse_start_time(&date_time)?;

        let calimoto_url = optional_url(input.calimoto_url.as_deref(), "Calimoto")?;
        let relive_url = optional_url(input.relive_url.as_deref(), "Relive")?;
        let rider_ids = self.check_riders(input.rider_ids.unwrap_or_default()).await?;
        self.check_files(files)?;

        let staged = self.stage_files(files).await?;
        let now = Utc::now().fixed_offset();
        let model = ride::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(title),
            description: Set(description),
            date_time: Set(date_time),
            start_point: Set(start_point),
            end_point: Set(end_point),
            header_photo: Set(staged.header_photo.clone()),
            gpx_file: Set(staged.gpx_file.clone()),
            calimoto_url: Set(calimoto_url),
            relive_url: Set(relive_url),
            completed: Set(input.completed.unwrap_or(false)),
            created_by: Set(Some(creator.id.clone())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let ride = match self.ride_repo.create_with_riders(model, &rider_ids).await {
            Ok(ride) => ride,
            Err(e) => {
                self.discard(&staged).await;
                return Err(e);
            }
        };

        tracing::info!(ride_id = %ride.id, title = %ride.title, created_by = %creator.id, "Ride created");
        Ok(ride)
    }

    /// Edit a ride on behalf of staff.
    pub async fn edit_ride(
        &self,
        actor: &user::Model,
        id: &str,
        input: RideInput,
    ) -> AppResult<ride::Model> {
        self.edit_ride_with_files(actor, id, input, RideFiles::default())
            .await
    }

    /// Edit a ride and replace its files in one step.
    ///
    /// Fields, riders and file references commit together; replaced files
    /// are removed only once the update is stored.
    pub async fn edit_ride_with_files(
        &self,
        actor: &user::Model,
        id: &str,
        input: RideInput,
        files: RideFiles<'_>,
    ) -> AppResult<ride::Model> {
        require_staff(actor)?;
        input.validate()?;

        let ride = self.ride_repo.get_by_id(id).await?;
        let previous = StagedFiles {
            header_photo: files.header_photo.and(ride.header_photo.clone()),
            gpx_file: files.gpx_file.and(ride.gpx_file.clone()),
        };
        let mut active: ride::ActiveModel = ride.into();

        if let Some(title) = input.title {
            active.title = Set(non_blank(title)?);
        }
        if let Some(description) = input.description {
            active.description = Set(non_blank(description)?);
        }
        if let Some(date_time) = input.date_time {
            active.date_time = Set(self.parse_start_time(&non_blank(date_time)?)?);
        }
        if let Some(start_point) = input.start_point {
            active.start_point = Set(non_blank(start_point)?);
        }
        if let Some(end_point) = input.end_point {
            active.end_point = Set(non_blank(end_point)?);
        }
        if let Some(url) = input.calimoto_url {
            active.calimoto_url = Set(optional_url(Some(&url), "Calimoto")?);
        }
        if let Some(url) = input.relive_url {
            active.relive_url = Set(optional_url(Some(&url), "Relive")?);
        }
        if let Some(completed) = input.completed {
            active.completed = Set(completed);
        }

        let rider_ids = match input.rider_ids {
            Some(ids) => Some(self.check_riders(ids).await?),
            None => None,
        };
        self.check_files(files)?;

        let staged = self.stage_files(files).await?;
        if let Some(key) = &staged.header_photo {
            active.header_photo = Set(Some(key.clone()));
        }
        if let Some(key) = &staged.gpx_file {
            active.gpx_file = Set(Some(key.clone()));
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        let ride = match self
            .ride_repo
            .update_with_riders(active, rider_ids.as_deref())
            .await
        {
            Ok(ride) => ride,
            Err(e) => {
                self.discard(&staged).await;
                return Err(e);
            }
        };
        self.discard(&previous).await;

        tracing::info!(ride_id = %ride.id, edited_by = %actor.id, "Ride updated");
        Ok(ride)
    }

    /// Replace the header photo and/or GPX route of a ride.
    pub async fn set_ride_files(
        &self,
        actor: &user::Model,
        id: &str,
        header_photo: Option<&Upload>,
        gpx_file: Option<&Upload>,
    ) -> AppResult<ride::Model> {
        require_staff(actor)?;
        if header_photo.is_none() && gpx_file.is_none() {
            return self.ride_repo.get_by_id(id).await;
        }

        let files = RideFiles {
            header_photo,
            gpx_file,
        };
        self.edit_ride_with_files(actor, id, RideInput::default(), files)
            .await
    }

    fn check_files(&self, files: RideFiles<'_>) -> AppResult<()> {
        if let Some(upload) = files.header_photo {
            self.media.validate(MediaCategory::RideHeader, upload)?;
        }
        if let Some(upload) = files.gpx_file {
            self.media.validate(MediaCategory::GpxRoute, upload)?;
        }
        Ok(())
    }

    /// Store checked uploads ahead of the row that will point at them.
    async fn stage_files(&self, files: RideFiles<'_>) -> AppResult<StagedFiles> {
        let mut staged = StagedFiles::default();
        if let Some(upload) = files.header_photo {
            let key = self.media.store(MediaCategory::RideHeader, upload).await?;
            staged.header_photo = Some(key);
        }
        if let Some(upload) = files.gpx_file {
            match self.media.store(MediaCategory::GpxRoute, upload).await {
                Ok(key) => staged.gpx_file = Some(key),
                Err(e) => {
                    self.discard(&staged).await;
                    return Err(e);
                }
            }
        }
        Ok(staged)
    }

    async fn discard(&self, files: &StagedFiles) {
        for key in [files.header_photo.as_deref(), files.gpx_file.as_deref()]
            .into_iter()
            .flatten()
        {
            self.media.remove(key).await;
        }
    }

    /// Mark a ride as completed. Completing twice changes nothing.
    pub async fn mark_complete(&self, actor: &user::Model, id: &str) -> AppResult<ride::Model> {
        require_staff(actor)?;
        let ride = self.ride_repo.get_by_id(id).await?;
        if ride.completed {
            return Ok(ride);
        }

        let mut active: ride::ActiveModel = ride.into();
        active.completed = Set(true);
        active.updated_at = Set(Utc::now().fixed_offset());
        let ride = self.ride_repo.update(active).await?;

        tracing::info!(ride_id = %ride.id, completed_by = %actor.id, "Ride completed");
        Ok(ride)
    }

    /// Join a ride. Joining twice keeps a single participation.
    pub async fn join(&self, id: &str, user: &user::Model) -> AppResult<ride::Model> {
        let ride = self.ride_repo.get_by_id(id).await?;
        self.ride_repo.add_rider(&ride.id, &user.id).await?;
        tracing::debug!(ride_id = %ride.id, user_id = %user.id, "Rider joined");
        Ok(ride)
    }

    /// Leave a ride. Leaving a ride one is not on is a no-op.
    pub async fn leave(&self, id: &str, user: &user::Model) -> AppResult<ride::Model> {
        let ride = self.ride_repo.get_by_id(id).await?;
        self.ride_repo.remove_rider(&ride.id, &user.id).await?;
        tracing::debug!(ride_id = %ride.id, user_id = %user.id, "Rider left");
        Ok(ride)
    }

    /// Delete a ride and its stored files.
    pub async fn delete_ride(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        require_staff(actor)?;
        let ride = self.ride_repo.get_by_id(id).await?;
        let photos = self.photo_repo.find_by_ride(&ride.id).await?;

        self.ride_repo.delete(&ride.id).await?;

        for key in [ride.header_photo.as_deref(), ride.gpx_file.as_deref()]
            .into_iter()
            .flatten()
        {
            self.media.remove(key).await;
        }
        for (photo, _) in &photos {
            self.media.remove(&photo.photo).await;
        }

        tracing::info!(ride_id = %ride.id, deleted_by = %actor.id, "Ride deleted");
        Ok(())
    }

    /// Photos of a ride in gallery order.
    pub async fn list_photos(
        &self,
        ride_id: &str,
    ) -> AppResult<Vec<(ride_photo::Model, Option<user::Model>)>> {
        let ride = self.ride_repo.get_by_id(ride_id).await?;
        self.photo_repo.find_by_ride(&ride.id).await
    }

    /// Add a photo to a ride's gallery.
    pub async fn add_photo(
        &self,
        ride_id: &str,
        uploader: &user::Model,
        upload: &Upload,
        caption: Option<String>,
        order: Option<i32>,
    ) -> AppResult<ride_photo::Model> {
        let ride = self.ride_repo.get_by_id(ride_id).await?;
        let caption = caption.unwrap_or_default().trim().to_string();
        check_caption(&caption)?;

        let key = self.media.store(MediaCategory::RidePhoto, upload).await?;
        let model = ride_photo::ActiveModel {
            id: Set(self.id_gen.generate()),
            ride_id: Set(ride.id.clone()),
            photo: Set(key),
            caption: Set(caption),
            uploaded_by: Set(uploader.id.clone()),
            display_order: Set(order.unwrap_or(0)),
            created_at: Set(Utc::now().fixed_offset()),
        };

        let photo = self.photo_repo.create(model).await?;
        tracing::info!(ride_id = %ride.id, photo_id = %photo.id, "Ride photo added");
        Ok(photo)
    }

    async fn get_photo(&self, ride_id: &str, photo_id: &str) -> AppResult<ride_photo::Model> {
        self.photo_repo
            .find_by_id(photo_id)
            .await?
            .filter(|p| p.ride_id == ride_id)
            .ok_or_else(|| AppError::NotFound(format!("Photo not found: {photo_id}")))
    }

    /// Change caption and/or order of a photo. Uploader or staff only.
    pub async fn update_photo(
        &self,
        actor: &user::Model,
        ride_id: &str,
        photo_id: &str,
        caption: Option<String>,
        order: Option<i32>,
    ) -> AppResult<ride_photo::Model> {
        let photo = self.get_photo(ride_id, photo_id).await?;
        if photo.uploaded_by != actor.id && !actor.is_staff {
            return Err(AppError::Forbidden(
                "You can only edit your own photos.".to_string(),
            ));
        }

        let mut active: ride_photo::ActiveModel = photo.into();
        if let Some(caption) = caption {
            let caption = caption.trim().to_string();
            check_caption(&caption)?;
            active.caption = Set(caption);
        }
        if let Some(order) = order {
            active.display_order = Set(order);
        }

        self.photo_repo.update(active).await
    }

    /// Delete a photo and its file. Uploader or staff only.
    pub async fn delete_photo(
        &self,
        actor: &user::Model,
        ride_id: &str,
        photo_id: &str,
    ) -> AppResult<()> {
        let photo = self.get_photo(ride_id, photo_id).await?;
        if photo.uploaded_by != actor.id && !actor.is_staff {
            return Err(AppError::Forbidden(
                "You can only delete your own photos.".to_string(),
            ));
        }

        self.photo_repo.delete(&photo.id).await?;
        self.media.remove(&photo.photo).await;
        Ok(())
    }

    /// Comments on a ride, oldest first.
    pub async fn list_comments(
        &self,
        ride_id: &str,
    ) -> AppResult<Vec<(ride_comment::Model, Option<user::Model>)>> {
        let ride = self.ride_repo.get_by_id(ride_id).await?;
        self.comment_repo.find_by_ride(&ride.id).await
    }

    /// Comment on a ride.
    pub async fn add_comment(
        &self,
        ride_id: &str,
        author: &user::Model,
        message: &str,
    ) -> AppResult<ride_comment::Model> {
        let ride = self.ride_repo.get_by_id(ride_id).await?;
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation("Comment cannot be empty.".to_string()));
        }

        let now = Utc::now().fixed_offset();
        let model = ride_comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            ride_id: Set(ride.id),
            user_id: Set(author.id.clone()),
            message: Set(message.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        self.comment_repo.create(model).await
    }

    /// Delete a comment. Author or staff only.
    pub async fn delete_comment(
        &self,
        actor: &user::Model,
        ride_id: &str,
        comment_id: &str,
    ) -> AppResult<()> {
        let comment = self
            .comment_repo
            .find_by_id(comment_id)
            .await?
            .filter(|c| c.ride_id == ride_id)
            .ok_or_else(|| AppError::NotFound(format!("Comment not found: {comment_id}")))?;

        if comment.user_id != actor.id && !actor.is_staff {
            return Err(AppError::Forbidden(
                "You can only delete your own comments.".to_string(),
            ));
        }

        self.comment_repo.delete(&comment.id).await
    }

    async fn check_riders(&self, rider_ids: Vec<String>) -> AppResult<Vec<String>> {
        let unique: Vec<String> = rider_ids
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if unique.is_empty() {
            return Ok(unique);
        }

        let found = self.user_repo.find_by_ids(&unique).await?;
        if let Some(missing) = unique.iter().find(|id| !found.iter().any(|u| &u.id == *id)) {
            return Err(AppError::Validation(format!("Invalid rider id: {missing}")));
        }
        Ok(unique)
    }
}

fn required(value: Option<&str>) -> AppResult<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| AppError::Validation(REQUIRED_FIELDS_MESSAGE.to_string()))
}

fn non_blank(value: String) -> AppResult<String> {
    required(Some(&value))
}

fn check_caption(caption: &str) -> AppResult<()> {
    if caption.chars().count() > 200 {
        return Err(AppError::Validation(
            "Caption must be at most 200 characters.".to_string(),
        ));
    }
    Ok(())
}

/// Validate an optional link. Empty means unset.
fn optional_url(value: Option<&str>, label: &str) -> AppResult<String> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Ok(String::new());
    }
    if value.len() > 500 {
        return Err(AppError::Validation(format!(
            "{label} URL must be at most 500 characters."
        )));
    }

    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value.to_string()),
        _ => Err(AppError::Validation(format!("Enter a valid {label} URL."))),
    }
}
