use thiserror::Error;

use lanseat_types::api::Reply;

use crate::replies;

/// Failure of a command, button or message handler. Every variant becomes a
/// reply for the user; nothing escapes the router silently.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input the user can correct (date format, email, seat range, ...)
    #[error("{0}")]
    Validation(String),

    /// Someone else got there first (seat, nickname, email)
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("permission denied")]
    PermissionDenied,

    /// A stored session stage this build does not recognise
    #[error("corrupted registration session: {0}")]
    CorruptedSession(String),

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Storage(anyhow::anyhow!("spawn_blocking join error: {}", e))
    }
}

impl ApiError {
    pub fn to_reply(&self) -> Reply {
        match self {
            Self::Validation(msg) => replies::error("Invalid Input", msg),
            Self::Conflict(msg) => replies::error("Conflict", msg),
            Self::NotFound(msg) => replies::error("Not Found", msg),
            Self::PermissionDenied => replies::error(
                "Permission Denied",
                "You don't have the required permissions to use this command.",
            ),
            Self::CorruptedSession(_) => replies::error(
                "Registration Error",
                "Your registration could not be continued. Type **!cancel** to abort it, then start again with /register.",
            ),
            Self::Storage(_) => replies::error("Something Went Wrong", "An error occurred. Please try again later."),
        }
        .ephemeral()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_hide_details() {
        let reply = ApiError::Storage(anyhow::anyhow!("disk I/O error at /var/lib")).to_reply();
        let text = reply.plain_text();
        assert!(text.contains("try again later"));
        assert!(!text.contains("/var/lib"));
        assert!(reply.ephemeral);
    }

    #[test]
    fn corrupted_session_points_to_cancel() {
        let reply = ApiError::CorruptedSession("collectingNickname".into()).to_reply();
        assert!(reply.plain_text().contains("!cancel"));
    }
}
