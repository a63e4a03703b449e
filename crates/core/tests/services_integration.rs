//! Service integration tests against a migrated in-memory `SQLite` database.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use club_common::{AppError, LocalStorage};
use bytes::Bytes;
use club_core::{
    ChoiceInput, CreatePollInput, MediaService, NewMemberInput, PollService, ProfileImage,
    ProfileService, RegisterInput, RideFiles, RideInput, RideService, UpdateProfileInput, Upload,
    UserService,
};
use club_db::{
    entities::{Profile, Ride, RideRider, User, Vote, user},
    repositories::{
        PollRepository, ProfileRepository, RideCommentRepository, RideFilter, RidePhotoRepository,
        RideRepository, UserRepository, VoteRepository,
    },
    test_utils::TestDatabase,
};
use sea_orm::{EntityTrait, PaginatorTrait};

const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

struct Services {
    db: TestDatabase,
    media_root: std::path::PathBuf,
    users: UserService,
    profiles: ProfileService,
    rides: RideService,
    polls: PollService,
}

async fn setup() -> Services {
    let db = TestDatabase::in_memory().await.unwrap();
    let conn = db.connection();

    let media_root = std::env::temp_dir().join(format!("club-core-it-{}", ulid::Ulid::new()));
    let storage = Arc::new(LocalStorage::new(media_root.clone(), "/media".to_string()));
    let media = MediaService::new(storage, 1024 * 1024);

    Services {
        users: UserService::new(UserRepository::new(conn.clone())),
        profiles: ProfileService::new(ProfileRepository::new(conn.clone()), media.clone()),
        rides: RideService::new(
            RideRepository::new(conn.clone()),
            RidePhotoRepository::new(conn.clone()),
            RideCommentRepository::new(conn.clone()),
            UserRepository::new(conn.clone()),
            media.clone(),
            chrono_tz::Europe::Madrid,
        ),
        polls: PollService::new(
            PollRepository::new(conn.clone()),
            VoteRepository::new(conn.clone()),
            UserRepository::new(conn.clone()),
            ProfileRepository::new(conn),
            media,
        ),
        db,
        media_root,
    }
}

async fn register(svc: &Services, username: &str) -> user::Model {
    svc.users
        .register(RegisterInput {
            username: username.to_string(),
            password: "secret-pass".to_string(),
            password2: "secret-pass".to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
}

async fn staff(svc: &Services) -> user::Model {
    svc.users
        .ensure_staff_account("captain", "secret-pass", "captain@example.com")
        .await
        .unwrap()
}

fn ride_input(title: &str, days_from_now: i64) -> RideInput {
    RideInput {
        title: Some(title.to_string()),
        description: Some("Coastal loop".to_string()),
        date_time: Some((Utc::now() + Duration::days(days_from_now)).to_rfc3339()),
        start_point: Some("Girona".to_string()),
        end_point: Some("Cadaqués".to_string()),
        ..Default::default()
    }
}

fn poll_input(title: &str, choices: &[&str]) -> CreatePollInput {
    CreatePollInput {
        title: title.to_string(),
        choices: choices
            .iter()
            .map(|text| ChoiceInput {
                text: (*text).to_string(),
                description: String::new(),
            })
            .collect(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_register_creates_profile() {
    let svc = setup().await;
    let user = register(&svc, "marta").await;

    let profile = Profile::find().one(svc.db.conn.as_ref()).await.unwrap().unwrap();
    assert_eq!(profile.user_id, user.id);
    assert_eq!(profile.bio, "");
    assert!(profile.avatar.is_none());
}

#[tokio::test]
async fn test_register_validation_messages() {
    let svc = setup().await;
    register(&svc, "marta").await;

    let err = svc
        .users
        .register(RegisterInput {
            username: "jordi".to_string(),
            password: "one".to_string(),
            password2: "two".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Passwords do not match.");

    let err = svc
        .users
        .register(RegisterInput {
            username: "marta".to_string(),
            password: "x".to_string(),
            password2: "x".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Username \"marta\" is already taken.");
    // Rejected signups leave no rows behind.
    let conn = svc.db.conn.as_ref();
    assert_eq!(User::find().count(conn).await.unwrap(), 1);
    assert_eq!(Profile::find().count(conn).await.unwrap(), 1);

    let err = svc
        .users
        .register(RegisterInput::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Username and password are required.");
}

#[tokio::test]
async fn test_authenticate_does_not_reveal_which_part_failed() {
    let svc = setup().await;
    register(&svc, "marta").await;

    let unknown = svc.users.authenticate("nobody", "secret-pass").await.unwrap_err();
    let wrong = svc.users.authenticate("marta", "wrong").await.unwrap_err();
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert!(matches!(wrong, AppError::InvalidCredentials));

    let user = svc.users.authenticate("marta", "secret-pass").await.unwrap();
    assert!(user.last_login.is_some());
}

#[tokio::test]
async fn test_token_rotation_invalidates_old_token() {
    let svc = setup().await;
    let user = register(&svc, "marta").await;

    let rotated = svc.users.rotate_token(&user.id).await.unwrap();
    assert_ne!(rotated.token, user.token);
    assert!(svc.users.authenticate_by_token(&user.token).await.unwrap().is_none());
    assert_eq!(
        svc.users
            .authenticate_by_token(&rotated.token)
            .await
            .unwrap()
            .unwrap()
            .id,
        user.id
    );
}

#[tokio::test]
async fn test_ensure_profile_is_idempotent() {
    let svc = setup().await;
    let user = register(&svc, "marta").await;

    let first = svc.profiles.ensure_profile(&user.id).await.unwrap();
    let second = svc.profiles.ensure_profile(&user.id).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(Profile::find().count(svc.db.conn.as_ref()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_member_requires_staff_and_unique_username() {
    let svc = setup().await;
    let member = register(&svc, "marta").await;
    let captain = staff(&svc).await;

    let input = NewMemberInput {
        username: "jordi".to_string(),
        password: "secret-pass".to_string(),
        ..Default::default()
    };

    let err = svc.users.create_member(&member, input.clone()).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let jordi = svc.users.create_member(&captain, input.clone()).await.unwrap();
    assert_eq!(jordi.username, "jordi");

    let err = svc.users.create_member(&captain, input).await.unwrap_err();
    assert_eq!(err.to_string(), "Username \"jordi\" already exists.");
    assert_eq!(User::find().count(svc.db.conn.as_ref()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_upcoming_prefers_next_future_ride() {
    let svc = setup().await;
    let captain = staff(&svc).await;

    svc.rides.create_ride(&captain, ride_input("Past", -10)).await.unwrap();
    svc.rides.create_ride(&captain, ride_input("Far", 20)).await.unwrap();
    svc.rides.create_ride(&captain, ride_input("Soon", 3)).await.unwrap();

    let upcoming = svc.rides.upcoming(Utc::now().fixed_offset()).await.unwrap().unwrap();
    assert_eq!(upcoming.title, "Soon");
}

#[tokio::test]
async fn test_upcoming_falls_back_to_latest_incomplete() {
    let svc = setup().await;
    let captain = staff(&svc).await;

    svc.rides.create_ride(&captain, ride_input("Older", -20)).await.unwrap();
    let recent = svc.rides.create_ride(&captain, ride_input("Recent", -5)).await.unwrap();

    let upcoming = svc.rides.upcoming(Utc::now().fixed_offset()).await.unwrap().unwrap();
    assert_eq!(upcoming.id, recent.id);

    svc.rides.mark_complete(&captain, &recent.id).await.unwrap();
    let upcoming = svc.rides.upcoming(Utc::now().fixed_offset()).await.unwrap().unwrap();
    assert_eq!(upcoming.title, "Older");
}

#[tokio::test]
async fn test_upcoming_none_when_all_completed() {
    let svc = setup().await;
    let captain = staff(&svc).await;

    let ride = svc.rides.create_ride(&captain, ride_input("Done", 4)).await.unwrap();
    svc.rides.mark_complete(&captain, &ride.id).await.unwrap();
    // Completing twice is fine
    svc.rides.mark_complete(&captain, &ride.id).await.unwrap();

    assert!(svc.rides.upcoming(Utc::now().fixed_offset()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_completed_filter_lists_newest_first() {
    let svc = setup().await;
    let captain = staff(&svc).await;

    for (title, days) in [("A", -30), ("B", -10), ("C", 5)] {
        let ride = svc.rides.create_ride(&captain, ride_input(title, days)).await.unwrap();
        if days < 0 {
            svc.rides.mark_complete(&captain, &ride.id).await.unwrap();
        }
    }

    let completed = svc
        .rides
        .list_rides(RideFilter {
            completed: Some(true),
            upcoming_after: None,
        })
        .await
        .unwrap();
    let titles: Vec<_> = completed.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["B", "A"]);
}

#[tokio::test]
async fn test_create_ride_requires_fields() {
    let svc = setup().await;
    let captain = staff(&svc).await;

    let mut input = ride_input("Coast", 2);
    input.start_point = Some("   ".to_string());

    let err = svc.rides.create_ride(&captain, input).await.unwrap_err();
    assert_eq!(err.to_string(), "Please fill in all required fields.");
    assert_eq!(Ride::find().count(svc.db.conn.as_ref()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_join_and_leave_are_idempotent() {
    let svc = setup().await;
    let captain = staff(&svc).await;
    let marta = register(&svc, "marta").await;
    let ride = svc.rides.create_ride(&captain, ride_input("Coast", 2)).await.unwrap();

    svc.rides.join(&ride.id, &marta).await.unwrap();
    svc.rides.join(&ride.id, &marta).await.unwrap();
    assert_eq!(svc.rides.rider_count(&ride.id).await.unwrap(), 1);
    assert!(svc.rides.is_rider(&ride.id, &marta.id).await.unwrap());
    let riders = svc.rides.riders(&ride).await.unwrap();
    assert_eq!(riders.len(), 1);
    assert_eq!(riders[0].username, "marta");

    svc.rides.leave(&ride.id, &marta).await.unwrap();
    svc.rides.leave(&ride.id, &marta).await.unwrap();
    assert_eq!(svc.rides.rider_count(&ride.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_edit_ride_keeps_absent_fields() {
    let svc = setup().await;
    let captain = staff(&svc).await;
    let ride = svc.rides.create_ride(&captain, ride_input("Coast", 2)).await.unwrap();

    let edited = svc
        .rides
        .edit_ride(
            &captain,
            &ride.id,
            RideInput {
                title: Some("Coast and hills".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(edited.title, "Coast and hills");
    assert_eq!(edited.description, ride.description);
    assert_eq!(edited.start_point, ride.start_point);
    assert_eq!(edited.date_time, ride.date_time);
}

fn png(name: &str) -> Upload {
    Upload::new(name, Some("image/png".to_string()), Bytes::from_static(PNG_HEADER))
}

/// Number of files stored under a media category directory.
fn stored_files(svc: &Services, dir: &str) -> usize {
    fn walk(path: &std::path::Path) -> usize {
        std::fs::read_dir(path).map_or(0, |entries| {
            entries
                .flatten()
                .map(|entry| {
                    let path = entry.path();
                    if path.is_dir() { walk(&path) } else { 1 }
                })
                .sum()
        })
    }
    walk(&svc.media_root.join(dir))
}

#[tokio::test]
async fn test_edit_ride_with_unknown_rider_changes_nothing() {
    let svc = setup().await;
    let captain = staff(&svc).await;
    let marta = register(&svc, "marta").await;
    let ride = svc.rides.create_ride(&captain, ride_input("Coast", 2)).await.unwrap();
    svc.rides.join(&ride.id, &marta).await.unwrap();
    let header = png("header.png");

    let err = svc
        .rides
        .edit_ride_with_files(
            &captain,
            &ride.id,
            RideInput {
                title: Some("Renamed".to_string()),
                rider_ids: Some(vec!["nobody".to_string()]),
                ..Default::default()
            },
            RideFiles {
                header_photo: Some(&header),
                gpx_file: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let stored = svc.rides.get(&ride.id).await.unwrap();
    assert_eq!(stored.title, "Coast");
    assert!(stored.header_photo.is_none());
    assert!(svc.rides.is_rider(&ride.id, &marta.id).await.unwrap());
    assert_eq!(stored_files(&svc, "ride_headers"), 0);
}

#[tokio::test]
async fn test_edit_ride_replaces_fields_riders_and_files_together() {
    let svc = setup().await;
    let captain = staff(&svc).await;
    let marta = register(&svc, "marta").await;
    let jordi = register(&svc, "jordi").await;
    let first = png("first.png");
    let ride = svc
        .rides
        .create_ride_with_files(
            &captain,
            RideInput {
                rider_ids: Some(vec![marta.id.clone()]),
                ..ride_input("Coast", 2)
            },
            RideFiles {
                header_photo: Some(&first),
                gpx_file: None,
            },
        )
        .await
        .unwrap();
    let first_key = ride.header_photo.clone().unwrap();
    assert!(svc.media_root.join(&first_key).exists());

    // A bad route file rejects the whole edit.
    let gpx = Upload::new("route.txt", None, Bytes::from_static(b"not a route"));
    let second = png("second.png");
    let err = svc
        .rides
        .edit_ride_with_files(
            &captain,
            &ride.id,
            ride_input("Renamed", 3),
            RideFiles {
                header_photo: Some(&second),
                gpx_file: Some(&gpx),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(svc.rides.get(&ride.id).await.unwrap().title, "Coast");
    assert_eq!(stored_files(&svc, "ride_headers"), 1);

    let edited = svc
        .rides
        .edit_ride_with_files(
            &captain,
            &ride.id,
            RideInput {
                title: Some("Renamed".to_string()),
                rider_ids: Some(vec![jordi.id.clone()]),
                ..Default::default()
            },
            RideFiles {
                header_photo: Some(&second),
                gpx_file: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(edited.title, "Renamed");
    let riders = svc.rides.riders(&edited).await.unwrap();
    assert_eq!(riders.len(), 1);
    assert_eq!(riders[0].username, "jordi");

    let second_key = edited.header_photo.unwrap();
    assert_ne!(second_key, first_key);
    assert!(svc.media_root.join(&second_key).exists());
    assert!(!svc.media_root.join(&first_key).exists());
}

#[tokio::test]
async fn test_save_profile_rejects_all_on_bad_image() {
    let svc = setup().await;
    let marta = register(&svc, "marta").await;
    let profile = svc.profiles.ensure_profile(&marta.id).await.unwrap();

    let images = vec![
        (ProfileImage::Avatar, png("me.png")),
        (
            ProfileImage::BikePhoto1,
            Upload::new("bike.txt", None, Bytes::from_static(b"plain text")),
        ),
    ];
    let input = UpdateProfileInput {
        bio: Some("changed bio".to_string()),
    };
    let err = svc
        .profiles
        .save_profile(profile.clone(), input.clone(), images)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let unchanged = svc.profiles.ensure_profile(&marta.id).await.unwrap();
    assert_eq!(unchanged.bio, "");
    assert!(unchanged.avatar.is_none());
    assert_eq!(stored_files(&svc, "avatars"), 0);

    let saved = svc
        .profiles
        .save_profile(unchanged, input, vec![(ProfileImage::Avatar, png("me.png"))])
        .await
        .unwrap();
    assert_eq!(saved.bio, "changed bio");
    let first = saved.avatar.clone().unwrap();

    let saved = svc
        .profiles
        .save_profile(saved, UpdateProfileInput::default(), vec![(ProfileImage::Avatar, png("new.png"))])
        .await
        .unwrap();
    assert_eq!(saved.bio, "changed bio");
    assert!(!svc.media_root.join(&first).exists());
    assert!(svc.media_root.join(saved.avatar.unwrap()).exists());
}

#[tokio::test]
async fn test_vote_replaces_previous_choice() {
    let svc = setup().await;
    let marta = register(&svc, "marta").await;
    let (poll, choices) = svc
        .polls
        .create_poll(&marta, poll_input("Next ride", &["Pyrenees", "Coast"]))
        .await
        .unwrap();

    svc.polls.cast_vote(&poll.id, Some(choices[0].id.as_str()), &marta).await.unwrap();
    svc.polls.cast_vote(&poll.id, Some(choices[1].id.as_str()), &marta).await.unwrap();

    assert_eq!(Vote::find().count(svc.db.conn.as_ref()).await.unwrap(), 1);
    assert_eq!(svc.polls.total_votes(&poll.id).await.unwrap(), 1);

    let detail = svc.polls.poll_detail(poll, Some(&marta)).await.unwrap();
    assert_eq!(detail.total_votes, 1);
    assert_eq!(detail.user_vote.as_deref(), Some(choices[1].id.as_str()));
    assert_eq!(detail.choices[0].vote_count, 0);
    assert_eq!(detail.choices[1].vote_count, 1);
    assert_eq!(detail.choices[1].percentage, 100.0);
    assert_eq!(detail.choices[1].voters[0].user.username, "marta");
}

#[tokio::test]
async fn test_vote_percentages_and_order() {
    let svc = setup().await;
    let voters = [
        register(&svc, "anna").await,
        register(&svc, "biel").await,
        register(&svc, "carla").await,
    ];
    let (poll, choices) = svc
        .polls
        .create_poll(&voters[0], poll_input("Next ride", &["Pyrenees", "Coast"]))
        .await
        .unwrap();

    svc.polls.cast_vote(&poll.id, Some(choices[0].id.as_str()), &voters[0]).await.unwrap();
    svc.polls.cast_vote(&poll.id, Some(choices[1].id.as_str()), &voters[1]).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    svc.polls.cast_vote(&poll.id, Some(choices[1].id.as_str()), &voters[2]).await.unwrap();

    let detail = svc.polls.poll_detail(poll, None).await.unwrap();
    assert_eq!(detail.total_votes, 3);
    assert!(detail.user_vote.is_none());
    assert_eq!(detail.choices[0].percentage, 33.3);
    assert_eq!(detail.choices[1].percentage, 66.7);

    let names: Vec<_> = detail.choices[1]
        .voters
        .iter()
        .map(|v| v.user.username.as_str())
        .collect();
    assert_eq!(names, ["carla", "biel"]);
}

#[tokio::test]
async fn test_vote_rejects_choice_of_other_poll() {
    let svc = setup().await;
    let marta = register(&svc, "marta").await;
    let (first, _) = svc
        .polls
        .create_poll(&marta, poll_input("First", &["A"]))
        .await
        .unwrap();
    let (_, other_choices) = svc
        .polls
        .create_poll(&marta, poll_input("Second", &["B"]))
        .await
        .unwrap();

    let err = svc
        .polls
        .cast_vote(&first.id, Some(other_choices[0].id.as_str()), &marta)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid choice for this poll");
    assert_eq!(Vote::find().count(svc.db.conn.as_ref()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_active_poll_is_newest_active() {
    let svc = setup().await;
    let marta = register(&svc, "marta").await;

    assert!(svc.polls.active_poll().await.unwrap().is_none());

    svc.polls.create_poll(&marta, poll_input("Old", &["A"])).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let (newer, _) = svc.polls.create_poll(&marta, poll_input("New", &["B"])).await.unwrap();

    assert_eq!(svc.polls.active_poll().await.unwrap().unwrap().id, newer.id);
}

#[tokio::test]
async fn test_member_delete_cascades() {
    let svc = setup().await;
    let captain = staff(&svc).await;
    let marta = register(&svc, "marta").await;

    let ride = svc.rides.create_ride(&marta, ride_input("Marta's loop", 3)).await.unwrap();
    svc.rides.join(&ride.id, &marta).await.unwrap();
    let (poll, choices) = svc
        .polls
        .create_poll(&marta, poll_input("Next ride", &["A"]))
        .await
        .unwrap();
    svc.polls.cast_vote(&poll.id, Some(choices[0].id.as_str()), &marta).await.unwrap();

    let err = svc.users.delete_member(&captain, &captain.id).await.unwrap_err();
    assert_eq!(err.to_string(), "You cannot delete yourself.");

    svc.users.delete_member(&captain, &marta.id).await.unwrap();

    let conn = svc.db.conn.as_ref();
    assert_eq!(Vote::find().count(conn).await.unwrap(), 0);
    assert_eq!(RideRider::find().count(conn).await.unwrap(), 0);
    // Only the staff account's profile is left
    assert_eq!(Profile::find().count(conn).await.unwrap(), 1);

    let ride = svc.rides.get(&ride.id).await.unwrap();
    assert!(ride.created_by.is_none());
    let poll = svc.polls.get(&poll.id).await.unwrap();
    assert!(poll.created_by.is_none());
}
