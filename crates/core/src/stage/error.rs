//! Error types for pipeline stages.

use std::path::PathBuf;

use thiserror::Error;

/// Failure class of a stage error, driving the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network or timeout class; retried with bounded attempts.
    Transient,
    /// Quota, rate limit or permanent rejection; aborts the batch.
    Fatal,
    /// Disk or permission problem; aborts the batch.
    LocalIo,
}

/// Errors that can occur while running a stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// Network or timeout failure talking to an external service.
    #[error("{stage}: transient failure: {reason}")]
    Transient { stage: String, reason: String },

    /// Quota or rate limit reached (HTTP 402/429).
    #[error("{stage}: quota exceeded (HTTP {status}): {message}")]
    QuotaExceeded {
        stage: String,
        status: u16,
        message: String,
    },

    /// Any other non-success response.
    #[error("{stage}: request rejected (HTTP {status}): {message}")]
    Rejected {
        stage: String,
        status: u16,
        message: String,
    },

    /// Processing failed.
    #[error("{stage}: {reason}")]
    Failed { stage: String, reason: String },

    /// Stage input missing.
    #[error("{stage}: input not found: {path}")]
    InputNotFound { stage: String, path: PathBuf },

    /// Local filesystem failure.
    #[error("{stage}: I/O error on {path}: {source}")]
    Io {
        stage: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    /// Creates a transient error.
    pub fn transient(stage: &str, reason: impl Into<String>) -> Self {
        Self::Transient {
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a processing failure.
    pub fn failed(stage: &str, reason: impl Into<String>) -> Self {
        Self::Failed {
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io(stage: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            stage: stage.to_string(),
            path: path.into(),
            source,
        }
    }

    /// Maps a non-success HTTP status to an error.
    pub fn from_status(stage: &str, status: u16, body: &str) -> Self {
        let message: String = body.chars().take(200).collect();
        match status {
            402 | 429 => Self::QuotaExceeded {
                stage: stage.to_string(),
                status,
                message,
            },
            _ => Self::Rejected {
                stage: stage.to_string(),
                status,
                message,
            },
        }
    }

    /// The failure class of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transient { .. } => FailureKind::Transient,
            Self::QuotaExceeded { .. }
            | Self::Rejected { .. }
            | Self::Failed { .. } => FailureKind::Fatal,
            Self::InputNotFound { .. } | Self::Io { .. } => FailureKind::LocalIo,
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind() == FailureKind::Transient
    }

    /// Whether this is a quota or rate-limit error.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
