//! Error taxonomy for a run.
//!
//! All three kinds end up in the same user-visible banner, but they stay distinct so logs and
//! tests can tell a local rejection from a network failure or a server refusal.

use thiserror::Error;

/// Fallback banner text when the server rejects a run without saying why.
pub const SERVER_FALLBACK_MESSAGE: &str = "Failed to run JobTailor.";
/// Fallback banner text when the transport error carries no description.
pub const TRANSPORT_FALLBACK_MESSAGE: &str = "Unexpected error while running JobTailor.";

/// Missing input detected before anything is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please choose a CV file before running.")]
    MissingCvFile,
    #[error("Please provide a job URL.")]
    MissingJobUrl,
    #[error("Please paste the job description text.")]
    MissingJobText,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The endpoint could not be reached or the exchange broke off.
    #[error("{0}")]
    Transport(String),

    /// The endpoint answered, but with a failure status or an unreadable payload.
    #[error("{message}")]
    ServerRejected { status: Option<u16>, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunErrorKind {
    ValidationFailed,
    RequestFailed,
    ServerRejected,
}

impl RunError {
    pub fn kind(&self) -> RunErrorKind {
        match self {
            RunError::Validation(_) => RunErrorKind::ValidationFailed,
            RunError::Transport(_) => RunErrorKind::RequestFailed,
            RunError::ServerRejected { .. } => RunErrorKind::ServerRejected,
        }
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        let text = err.to_string();
        if text.trim().is_empty() {
            RunError::Transport(TRANSPORT_FALLBACK_MESSAGE.to_string())
        } else {
            RunError::Transport(text)
        }
    }

    /// Build a server rejection, falling back to the generic message when none was given.
    pub fn rejected(status: Option<u16>, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| SERVER_FALLBACK_MESSAGE.to_string());
        RunError::ServerRejected { status, message }
    }

    /// Text shown in the error banner.
    pub fn banner(&self) -> String {
        self.to_string()
    }
}
