//! Core error types for cadence-core.
//!
//! This module defines the error hierarchy using thiserror. The engine is
//! deliberately hard to fail: expansion and statistics degrade to empty
//! output on malformed input, so errors here are limited to overlay
//! persistence and caller-supplied window validation.

use chrono::NaiveDate;
use thiserror::Error;

/// Core error type for cadence-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Completion overlay errors
    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Completion overlay errors.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// Remote persistence of an optimistic overlay write failed; the
    /// overlay has already been rolled back when this is returned.
    #[error("Failed to persist completion for '{source_id}' on {date}: {source}")]
    PersistFailed {
        source_id: String,
        date: NaiveDate,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid date range
    #[error("Invalid date range: end ({end}) precedes start ({start})")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
