//! Repositories wrapping database access for each aggregate.

pub mod item;
pub mod poll;
pub mod profile;
pub mod ride;
pub mod ride_media;
pub mod user;
pub mod vote;

pub use item::ItemRepository;
pub use poll::PollRepository;
pub use profile::ProfileRepository;
pub use ride::{RideFilter, RideRepository};
pub use ride_media::{RideCommentRepository, RidePhotoRepository};
pub use user::UserRepository;
pub use vote::VoteRepository;
