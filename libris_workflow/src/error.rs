use std::time::Duration;

use libris_core::SessionId;
use thiserror::Error;

/// Failure of a single handler branch. Always recoverable: the turn
/// carries on without that handler's contribution.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("generation failed: {0}")]
    Generation(#[from] anyhow::Error),

    #[error("handler cancelled")]
    Cancelled,

    #[error("handler timed out after {0:?}")]
    TimedOut(Duration),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Failure of the intent classification call. Never leaves the classifier,
/// which falls back to `[end]`.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classification call failed: {0}")]
    Call(#[from] anyhow::Error),

    #[error("classification cancelled")]
    Cancelled,
}

/// Turn-fatal conditions. When any of these is returned the session is
/// left exactly as it was before the turn.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Summarization failed: {0}")]
    Summarization(anyhow::Error),

    #[error("Empty response from summarizer")]
    EmptySummary,

    #[error("Turn cancelled")]
    Cancelled,

    #[error("Session storage error: {0}")]
    Storage(anyhow::Error),
}
