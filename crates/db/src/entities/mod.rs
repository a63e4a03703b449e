//! Database entities.

pub mod item;
pub mod poll;
pub mod poll_choice;
pub mod profile;
pub mod ride;
pub mod ride_comment;
pub mod ride_photo;
pub mod ride_rider;
pub mod user;
pub mod vote;

pub use item::Entity as Item;
pub use poll::Entity as Poll;
pub use poll_choice::Entity as PollChoice;
pub use profile::Entity as Profile;
pub use ride::Entity as Ride;
pub use ride_comment::Entity as RideComment;
pub use ride_photo::Entity as RidePhoto;
pub use ride_rider::Entity as RideRider;
pub use user::Entity as User;
pub use vote::Entity as Vote;
