//! Errors for habit tracking, storage and streak analytics.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Errors that can occur while tracking habits
#[derive(Error, Debug)]
pub enum HabitError {
    #[error("Unsupported period type '{0}'. Supported: daily, weekly, monthly, quarterly, annually.")]
    InvalidPeriodType(String),

    #[error("Period boundary for {0} is outside the supported calendar range")]
    PeriodOutOfRange(NaiveDateTime),

    #[error("Habit '{habit}' is already tracked by user '{user}'")]
    AlreadyTracked { habit: String, user: String },

    #[error("Habit '{habit}' is not tracked by user '{user}'")]
    NotTracked { habit: String, user: String },

    #[error("Habit '{0}' is currently being tracked by users. Remove it from tracking before deleting.")]
    HabitInUse(String),

    #[error("Cannot mark a habit as completed for a future date ({0})")]
    CompletionInFuture(NaiveDate),

    #[error("Cannot mark a habit as completed on {date}, tracking started {start}")]
    CompletionBeforeStart { date: NaiveDate, start: NaiveDateTime },

    #[error("Invalid date '{0}'. Use YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Completion rate must be between 0 and 1, got {0}")]
    InvalidRate(f64),

    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: &'static str, key: String },

    #[error("Failed to read/write habits file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse habits file: {0}")]
    Json(#[from] serde_json::Error),
}

impl HabitError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound { kind, key: key.into() }
    }

    pub fn already_exists(kind: &'static str, key: impl Into<String>) -> Self {
        Self::AlreadyExists { kind, key: key.into() }
    }
}

pub type Result<T, E = HabitError> = std::result::Result<T, E>;
