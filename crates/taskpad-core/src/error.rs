use taskpad_shared::ErrorBody;
use thiserror::Error;

/// Every failure a call against the task API can produce.
///
/// The `Display` text is what a view shows to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("session expired; please log in again")]
    Unauthenticated,

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("session storage error: {0}")]
    Storage(String),
}

/// How a 401 on a given call is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScope {
    /// login/register: 401 means the submitted credentials were wrong.
    Credentials,
    /// Everything else: 401 means the bearer token is missing or no longer valid.
    Bearer,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn from_status(status: u16, body: &str, scope: AuthScope) -> Self {
        let message = error_message(status, body);
        match status {
            400 | 409 | 422 => Self::Validation(message),
            401 => match scope {
                AuthScope::Credentials => Self::Auth(message),
                AuthScope::Bearer => Self::Unauthenticated,
            },
            403 => Self::Authorization(message),
            404 => Self::NotFound(message),
            _ => Self::Server { status, message },
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

fn error_message(status: u16, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorBody>(body)
        && let Some(text) = envelope.text()
    {
        return text.to_string();
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('{') && !trimmed.starts_with('<') {
        return trimmed.to_string();
    }

    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map(|reason| reason.to_ascii_lowercase())
        .unwrap_or_else(|| format!("request failed with status {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_to_taxonomy() {
        let body = r#"{"error":"Email already taken"}"#;
        assert_eq!(
            ApiError::from_status(409, body, AuthScope::Credentials),
            ApiError::Validation("Email already taken".to_string())
        );
        assert_eq!(
            ApiError::from_status(403, "", AuthScope::Bearer),
            ApiError::Authorization("forbidden".to_string())
        );
        assert_eq!(
            ApiError::from_status(404, r#"{"message":"Task not found"}"#, AuthScope::Bearer),
            ApiError::NotFound("Task not found".to_string())
        );
        assert!(matches!(
            ApiError::from_status(502, "", AuthScope::Bearer),
            ApiError::Server { status: 502, .. }
        ));
    }

    #[test]
    fn unauthorized_depends_on_scope() {
        assert_eq!(
            ApiError::from_status(401, r#"{"error":"Invalid credentials"}"#, AuthScope::Credentials),
            ApiError::Auth("Invalid credentials".to_string())
        );
        assert!(ApiError::from_status(401, "", AuthScope::Bearer).is_unauthenticated());
    }

    #[test]
    fn plain_text_bodies_are_kept() {
        assert_eq!(
            ApiError::from_status(400, "title must not be blank\n", AuthScope::Bearer).to_string(),
            "title must not be blank"
        );
    }
}
