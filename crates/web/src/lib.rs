//! Server-rendered pages for the club application.
//!
//! Pages share the services and session resolution of the JSON API and
//! render embedded Tera templates. Messages for the next page travel in a
//! short-lived flash cookie.

pub mod flash;
pub mod pages;
pub mod session;
pub mod state;
pub mod templates;
pub mod views;

pub use pages::router;
pub use state::WebState;
pub use templates::Templates;
