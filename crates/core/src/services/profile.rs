//! Member profile service.

use chrono::Utc;
use club_common::{AppError, AppResult, IdGenerator, MediaCategory};
use club_db::{
    entities::{profile, user},
    repositories::ProfileRepository,
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::media::{MediaService, Upload};

/// Image slots on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileImage {
    Avatar,
    BikePhoto1,
    BikePhoto2,
    BikePhoto3,
}

impl ProfileImage {
    /// Every slot, in form order.
    pub const ALL: [Self; 4] = [
        Self::Avatar,
        Self::BikePhoto1,
        Self::BikePhoto2,
        Self::BikePhoto3,
    ];

    /// Form field name of this slot.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::BikePhoto1 => "bike_photo_1",
            Self::BikePhoto2 => "bike_photo_2",
            Self::BikePhoto3 => "bike_photo_3",
        }
    }

    const fn category(self) -> MediaCategory {
        match self {
            Self::Avatar => MediaCategory::Avatar,
            _ => MediaCategory::BikePhoto,
        }
    }

    fn current(self, profile: &profile::Model) -> Option<&str> {
        match self {
            Self::Avatar => profile.avatar.as_deref(),
            Self::BikePhoto1 => profile.bike_photo_1.as_deref(),
            Self::BikePhoto2 => profile.bike_photo_2.as_deref(),
            Self::BikePhoto3 => profile.bike_photo_3.as_deref(),
        }
    }
}

/// Input for updating a profile.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
}

/// Profile service for business logic.
#[derive(Clone)]
pub struct ProfileService {
    profile_repo: ProfileRepository,
    media: MediaService,
    id_gen: IdGenerator,
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(profile_repo: ProfileRepository, media: MediaService) -> Self {
        Self {
            profile_repo,
            media,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get the profile of a user, creating an empty one if needed.
    pub async fn ensure_profile(&self, user_id: &str) -> AppResult<profile::Model> {
        if let Some(profile) = self.profile_repo.find_by_user_id(user_id).await? {
            return Ok(profile);
        }

        let now = Utc::now().fixed_offset();
        let model = profile::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            avatar: Set(None),
            bike_photo_1: Set(None),
            bike_photo_2: Set(None),
            bike_photo_3: Set(None),
            bio: Set(String::new()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let profile = self.profile_repo.insert_if_absent(model).await?;
        tracing::debug!(user_id = %user_id, profile_id = %profile.id, "Profile ensured");
        Ok(profile)
    }

    /// Find a profile by ID with its user.
    pub async fn get_with_user(&self, id: &str) -> AppResult<(profile::Model, user::Model)> {
        self.profile_repo
            .find_with_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile not found: {id}")))
    }

    /// Profiles with their users, ordered by username.
    pub async fn list(
        &self,
        username: Option<&str>,
    ) -> AppResult<Vec<(profile::Model, user::Model)>> {
        self.profile_repo
            .find_all_with_users(username.filter(|u| !u.is_empty()))
            .await
    }

    /// Profiles belonging to the given users.
    pub async fn find_by_user_ids(&self, user_ids: &[String]) -> AppResult<Vec<profile::Model>> {
        self.profile_repo.find_by_user_ids(user_ids).await
    }

    /// Update the text fields of a profile. Absent fields keep their value.
    pub async fn update_profile(
        &self,
        profile: profile::Model,
        input: UpdateProfileInput,
    ) -> AppResult<profile::Model> {
        self.save_profile(profile, input, Vec::new()).await
    }

    /// Update the text fields and image slots of a profile in one write.
    ///
    /// Every image is checked before any file is stored. Replaced files are
    /// removed only after the row is updated; on failure the new files are
    /// discarded and the profile keeps its previous state.
    pub async fn save_profile(
        &self,
        profile: profile::Model,
        input: UpdateProfileInput,
        images: Vec<(ProfileImage, Upload)>,
    ) -> AppResult<profile::Model> {
        input.validate()?;
        for (slot, upload) in &images {
            self.media.validate(slot.category(), upload)?;
        }

        let mut stored: Vec<(ProfileImage, String)> = Vec::with_capacity(images.len());
        for (slot, upload) in &images {
            match self.media.store(slot.category(), upload).await {
                Ok(key) => stored.push((*slot, key)),
                Err(e) => {
                    self.discard(stored.iter().map(|(_, key)| key.as_str()).collect::<Vec<_>>()).await;
                    return Err(e);
                }
            }
        }

        let replaced: Vec<String> = stored
            .iter()
            .filter_map(|(slot, _)| slot.current(&profile).map(ToString::to_string))
            .collect();

        let mut active: profile::ActiveModel = profile.into();
        if let Some(bio) = input.bio {
            active.bio = Set(bio);
        }
        for (slot, key) in &stored {
            let key = Set(Some(key.clone()));
            match slot {
                ProfileImage::Avatar => active.avatar = key,
                ProfileImage::BikePhoto1 => active.bike_photo_1 = key,
                ProfileImage::BikePhoto2 => active.bike_photo_2 = key,
                ProfileImage::BikePhoto3 => active.bike_photo_3 = key,
            }
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        let profile = match self.profile_repo.update(active).await {
            Ok(profile) => profile,
            Err(e) => {
                self.discard(stored.iter().map(|(_, key)| key.as_str()).collect::<Vec<_>>()).await;
                return Err(e);
            }
        };
        self.discard(replaced.iter().map(String::as_str)).await;

        tracing::debug!(profile_id = %profile.id, images = stored.len(), "Profile saved");
        Ok(profile)
    }

    async fn discard<'a>(&self, keys: impl IntoIterator<Item = &'a str>) {
        for key in keys {
            self.media.remove(key).await;
        }
    }

    /// Delete a profile and its images.
    pub async fn delete(&self, profile: profile::Model) -> AppResult<()> {
        self.profile_repo.delete(&profile.id).await?;
        for slot in ProfileImage::ALL {
            if let Some(key) = slot.current(&profile) {
                self.media.remove(key).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_image_field_names() {
        assert_eq!(ProfileImage::BikePhoto2.field_name(), "bike_photo_2");
        assert_eq!(ProfileImage::Avatar.category(), MediaCategory::Avatar);
        assert_eq!(ProfileImage::BikePhoto3.category(), MediaCategory::BikePhoto);
    }
}
