//! Typed errors for conditions callers need to tell apart.
//! Everything else travels as `anyhow::Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrieverError {
    /// Operation only exists on the official (authenticated) API.
    #[error("{operation} requires authenticated access to the official Reddit API")]
    RequiresAuthentication { operation: &'static str },

    #[error("history_type must be either \"comment\" or \"submission\" (got {0:?})")]
    InvalidHistoryType(String),

    #[error("invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid query frequency {0:?}: expected <n><D|W|M|MS|Y|YS|A|AS>")]
    InvalidFrequency(String),

    /// The frequency produces no boundary inside the range (or start > end).
    #[error("query frequency {freq} is incompatible with date range {start} to {end}")]
    IncompatibleDateRange { start: String, end: String, freq: String },
}

impl RetrieverError {
    /// Configuration mistakes that should terminate a command-line run with status 1.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RetrieverError::InvalidDate(_)
                | RetrieverError::InvalidFrequency(_)
                | RetrieverError::IncompatibleDateRange { .. }
        )
    }
}
