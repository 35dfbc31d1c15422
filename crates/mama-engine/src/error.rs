//! Error types crossing module boundaries.
//!
//! Only [`AuthError`] and [`CredentialError`] are ever surfaced to an end user. Context and
//! summarizer failures are absorbed by the selector and replaced with
//! conservative defaults.

use thiserror::Error;

/// Why a request could not be tied to a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no session credential presented")]
    NoSession,
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
}

impl AuthError {
    /// Message shown to the caller. Not-found and expired are deliberately
    /// indistinguishable.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::NoSession => "No active session. Please sign in.",
            AuthError::SessionNotFound | AuthError::SessionExpired => {
                "Invalid or expired session. Please sign in again."
            }
        }
    }

    /// Label used for logs and metrics
    pub fn as_label(&self) -> &'static str {
        match self {
            AuthError::NoSession => "no_session",
            AuthError::SessionNotFound => "not_found",
            AuthError::SessionExpired => "expired",
        }
    }
}

/// Outcome of a rejected login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("unknown user")]
    UnknownUser,
    #[error("password does not match")]
    WrongPassword,
    #[error("credential backend unavailable: {0}")]
    Unavailable(String),
}

impl CredentialError {
    /// Message shown to the caller
    pub fn user_message(&self) -> &'static str {
        match self {
            CredentialError::UnknownUser => "Username not valid. Please signup first",
            CredentialError::WrongPassword => "Password doesn't match",
            CredentialError::Unavailable(_) => "Sign-in is temporarily unavailable",
        }
    }

    /// Label used for logs and metrics
    pub fn as_label(&self) -> &'static str {
        match self {
            CredentialError::UnknownUser => "unknown_user",
            CredentialError::WrongPassword => "wrong_password",
            CredentialError::Unavailable(_) => "unavailable",
        }
    }
}

/// Failure inside the context selector. Recovered locally.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("invalid language code: {0:?}")]
    InvalidLanguage(String),
    #[error("query is empty")]
    EmptyQuery,
    #[error("summarizer failed: {0}")]
    Summarizer(#[from] SummarizerError),
}

/// Conversation history lookups and writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("conversation {0} not found or access denied")]
    NotFound(i64),
    #[error("unsupported role {0:?}, expected \"user\" or \"assistant\"")]
    InvalidRole(String),
}

/// Failure of the external "summarize transcript" capability.
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("summarizer returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode summarizer response: {0}")]
    Decode(String),
    #[error("summarizer returned no choices")]
    EmptyResponse,
}
