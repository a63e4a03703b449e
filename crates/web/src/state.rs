//! Page state.

use std::sync::Arc;

use axum::extract::FromRef;
use club_api::AppState;
use club_common::AppResult;

use crate::templates::Templates;

/// State shared by every page handler.
#[derive(Clone)]
pub struct WebState {
    /// Services and configuration shared with the API.
    pub app: AppState,
    /// Compiled page templates.
    pub templates: Arc<Templates>,
}

impl WebState {
    /// Compile the templates and wrap the shared state.
    pub fn new(app: AppState) -> AppResult<Self> {
        Ok(Self {
            app,
            templates: Arc::new(Templates::new()?),
        })
    }
}

impl FromRef<WebState> for AppState {
    fn from_ref(state: &WebState) -> Self {
        state.app.clone()
    }
}
