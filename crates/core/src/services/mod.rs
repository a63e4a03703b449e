//! Business logic services.

#![allow(missing_docs)]

pub mod item;
pub mod media;
pub mod poll;
pub mod profile;
pub mod ride;
pub mod user;

pub use item::{ItemInput, ItemService};
pub use media::{MediaService, Upload};
pub use poll::{
    ChoiceDetail, ChoiceInput, CreatePollInput, PollDetail, PollService, PollSummary,
    UpdatePollInput, Voter, vote_percentage,
};
pub use profile::{ProfileImage, ProfileService, UpdateProfileInput};
pub use ride::{RideDetail, RideFiles, RideInput, RideService, RideSummary};
pub use user::{NewMemberInput, RegisterInput, UserService, require_staff};
