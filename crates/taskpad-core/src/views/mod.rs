//! Page controllers.
//!
//! Each page moves through [`PageState`] and never keeps data across a
//! mutation: a successful create, update or delete invalidates the collection
//! that owns the entity and reloads it from the server.

mod admin_panel;
mod dashboard;
mod task_detail;

pub use admin_panel::{AdminData, AdminPanel};
pub use dashboard::{Dashboard, StatusCounts, TaskDraft, TaskFilter};
pub use task_detail::{EditBuffer, EditMode, TaskDetail};

use chrono::NaiveDate;

use crate::error::ApiError;
use crate::session::SessionStore;
use crate::storage::TokenStore;

#[derive(Debug, Clone, PartialEq)]
pub enum PageState<T> {
    Loading,
    Ready(T),
    Error(String),
    /// The server refused the caller's role; privileged content is hidden.
    Forbidden(String),
    Unauthenticated,
}

impl<T> PageState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            PageState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PageState::Loading)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PageState::Error(message) | PageState::Forbidden(message) => Some(message),
            _ => None,
        }
    }
}

/// Where the page wants to go after an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    Login,
    Dashboard,
}

pub(crate) enum Failure {
    Redirect,
    Forbidden(String),
    Inline(String),
}

/// Turns an error into what the page shows. An expired token logs the
/// session out here.
pub(crate) fn classify<S: TokenStore>(session: &mut SessionStore<S>, err: ApiError) -> Failure {
    if session.absorb(&err) {
        return Failure::Redirect;
    }
    match err {
        ApiError::Authorization(message) => Failure::Forbidden(message),
        other => Failure::Inline(other.to_string()),
    }
}

/// Form text to an optional calendar date; blank means none.
pub(crate) fn parse_due_date(raw: &str) -> Result<Option<NaiveDate>, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ApiError::validation(format!("due date must be YYYY-MM-DD, got {trimmed:?}")))
}

pub(crate) fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
