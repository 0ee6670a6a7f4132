//! Errors that cross the component boundary.
//!
//! Internal plumbing uses [`ohno::AppError`] throughout. Operations whose failures
//! the queue logic must dispatch on return [`ScoringError`] instead, which carries a
//! stable machine-readable kind plus an "unrecoverable" flag deciding requeueing.

use serde::{Deserialize, Serialize};

/// Stable error kinds consumed by queue logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    AggregationNotFound,
    PackageNotFound,
    Blacklisted,
    NoDownloader,
    MissingRange,
    Conflict,
    RetriesExhausted,
    Acquisition,
    Store,
}

impl ErrorKind {
    /// The wire representation of this kind.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AggregationNotFound => "AGGREGATION_NOT_FOUND",
            Self::PackageNotFound => "PACKAGE_NOT_FOUND",
            Self::Blacklisted => "BLACKLISTED",
            Self::NoDownloader => "NO_DOWNLOADER",
            Self::MissingRange => "MISSING_RANGE",
            Self::Conflict => "CONFLICT",
            Self::RetriesExhausted => "RETRIES_EXHAUSTED",
            Self::Acquisition => "ACQUISITION",
            Self::Store => "STORE",
        }
    }

    /// Whether failures of this kind must never be requeued.
    #[must_use]
    pub const fn is_unrecoverable(self) -> bool {
        matches!(self, Self::PackageNotFound | Self::Blacklisted)
    }
}

/// A failure with a stable kind, surfaced across the component boundary.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("aggregation not found, the first scoring cycle has not yet run")]
    AggregationNotFound,

    #[error("package '{0}' not found")]
    PackageNotFound(String),

    /// Raised by collectors feeding this tool when a package is on their
    /// blacklist. Carried here so queue logic can refuse to requeue it.
    #[error("package '{name}' is blacklisted: {reason}")]
    Blacklisted { name: String, reason: String },

    #[error("no suitable downloader for package '{0}'")]
    NoDownloader(String),

    #[error("could not find the {window} day entry in {series}")]
    MissingRange { series: &'static str, window: i64 },

    #[error("conflict while writing '{0}'")]
    Conflict(String),

    #[error("giving up on '{key}' after {attempts} conflicting attempts")]
    RetriesExhausted { key: String, attempts: u32 },

    #[error("{context}")]
    Acquisition {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{context}")]
    Store {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ScoringError {
    /// The stable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AggregationNotFound => ErrorKind::AggregationNotFound,
            Self::PackageNotFound(_) => ErrorKind::PackageNotFound,
            Self::Blacklisted { .. } => ErrorKind::Blacklisted,
            Self::NoDownloader(_) => ErrorKind::NoDownloader,
            Self::MissingRange { .. } => ErrorKind::MissingRange,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            Self::Acquisition { .. } => ErrorKind::Acquisition,
            Self::Store { .. } => ErrorKind::Store,
        }
    }

    /// Whether this failure must never be requeued.
    #[must_use]
    pub const fn is_unrecoverable(&self) -> bool {
        self.kind().is_unrecoverable()
    }

    /// Shorthand for a store-level failure.
    pub fn store(context: impl Into<String>, source: impl core::fmt::Display) -> Self {
        Self::Store {
            context: context.into(),
            source: ohno::app_err!("{source}").into_std_error(),
        }
    }

    /// Shorthand for an acquisition failure.
    pub fn acquisition(context: impl Into<String>, source: impl core::fmt::Display) -> Self {
        Self::Acquisition {
            context: context.into(),
            source: ohno::app_err!("{source}").into_std_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_have_stable_codes() {
        assert_eq!(ErrorKind::AggregationNotFound.code(), "AGGREGATION_NOT_FOUND");
        assert_eq!(ErrorKind::PackageNotFound.code(), "PACKAGE_NOT_FOUND");
        assert_eq!(ErrorKind::Blacklisted.code(), "BLACKLISTED");
        assert_eq!(ErrorKind::NoDownloader.code(), "NO_DOWNLOADER");
        assert_eq!(ErrorKind::MissingRange.code(), "MISSING_RANGE");
    }

    #[test]
    fn only_permanent_failures_are_unrecoverable() {
        assert!(ErrorKind::Blacklisted.is_unrecoverable());
        assert!(ErrorKind::PackageNotFound.is_unrecoverable());
        assert!(!ErrorKind::Conflict.is_unrecoverable());
        assert!(!ErrorKind::RetriesExhausted.is_unrecoverable());
        assert!(!ErrorKind::AggregationNotFound.is_unrecoverable());
    }

    #[test]
    fn error_reports_its_kind() {
        let err = ScoringError::NoDownloader("left-pad".into());
        assert_eq!(err.kind(), ErrorKind::NoDownloader);
        assert!(!err.is_unrecoverable());

        let err = ScoringError::Blacklisted {
            name: "left-pad".into(),
            reason: "spam".into(),
        };
        assert!(err.is_unrecoverable());
    }
}
