//! Error types for the lifecycle core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("phase lock rejected: {reason}")]
    PhaseLockRejected { reason: String },

    #[error("soul validation failed: {}", reasons.join("; "))]
    SoulValidationFailed { reasons: Vec<String> },

    #[error("soul parse error: {0}")]
    SoulParse(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("death clock corrupted: duration hash matches no candidate in 2..=7")]
    DeathClockCorrupted,

    #[error("bequest validation failed: {0}")]
    BequestValidationFailed(String),

    #[error("bequest transfer failed: {recipient} - {message}")]
    BequestTransferFailed { recipient: String, message: String },

    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn phase_lock_rejected(reason: impl Into<String>) -> Self {
        Self::PhaseLockRejected {
            reason: reason.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolated(message.into())
    }

    pub fn bequest_transfer_failed(
        recipient: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::BequestTransferFailed {
            recipient: recipient.into(),
            message: message.into(),
        }
    }
}
