//! Core business logic for the club application.

pub mod services;

pub use services::*;
