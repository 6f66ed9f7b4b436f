//! Error types for the aggregation pipeline.
//!
//! Stage errors are programmer errors (malformed input, broken ordering
//! preconditions) and abort the current render. External fetch failures are
//! reported per task or per asset instead, see [`crate::dispatch`] and
//! [`crate::pipeline::enrichment`].
//!
//! # Error Codes
//!
//! | Code | Raised by |
//! |------|-----------|
//! | `SCHEMA_MISMATCH` | Row normalizer, table construction |
//! | `EMPTY_SERIES` | Gap fill (no min/max to build a spine from) |
//! | `UNORDERED_OR_DUPLICATE_KEY` | Cumulative aggregator precondition |
//! | `COLUMN_NOT_FOUND` | Any stage addressing a column by name |
//! | `INVALID_PERIOD_KEY` | Key cell that is not date-like |
//! | `NON_NUMERIC` | Metric cell that is not a number |
//! | `INVALID_BOUNDS` | Explicit spine bounds with `min > max` |
//! | `INVALID_RULE` | Reconcile rule referencing unknown columns |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error codes for pipeline failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Row arity or column names do not match.
    SchemaMismatch,
    /// No rows to derive a period range from.
    EmptySeries,
    /// Period keys are not strictly ascending.
    UnorderedOrDuplicateKey,
    /// A referenced column does not exist.
    ColumnNotFound,
    /// A period key cell could not be read as a date.
    InvalidPeriodKey,
    /// A metric cell is not numeric.
    NonNumeric,
    /// Spine bounds are inverted.
    InvalidBounds,
    /// Reconcile rule is malformed.
    InvalidRule,
}

impl ErrorCode {
    /// Reason string for logs and user-facing messages.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::SchemaMismatch => "SCHEMA_MISMATCH",
            Self::EmptySeries => "EMPTY_SERIES",
            Self::UnorderedOrDuplicateKey => "UNORDERED_OR_DUPLICATE_KEY",
            Self::ColumnNotFound => "COLUMN_NOT_FOUND",
            Self::InvalidPeriodKey => "INVALID_PERIOD_KEY",
            Self::NonNumeric => "NON_NUMERIC",
            Self::InvalidBounds => "INVALID_BOUNDS",
            Self::InvalidRule => "INVALID_RULE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Errors raised by the pure pipeline stages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Row arity differs from the column list, or column names repeat.
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        /// Details.
        message: String,
    },

    /// The input table has no rows.
    #[error("Empty series: cannot build a period spine for '{column}'")]
    EmptySeries {
        /// Period key column.
        column: String,
    },

    /// Period keys are out of order or repeated.
    #[error("Period key '{column}' is unordered or duplicated at row {position}")]
    UnorderedOrDuplicateKey {
        /// Period key column.
        column: String,
        /// Row index of the first offending key.
        position: usize,
    },

    /// A column referenced by name is missing.
    #[error("Column not found: {column}")]
    ColumnNotFound {
        /// Missing column.
        column: String,
    },

    /// A period key cell is not a date.
    #[error("Invalid period key in '{column}' at row {position}: {value}")]
    InvalidPeriodKey {
        /// Period key column.
        column: String,
        /// Row index.
        position: usize,
        /// Rendered cell value.
        value: String,
    },

    /// A metric cell is not numeric.
    #[error("Non-numeric value in '{column}' at row {position}: {value}")]
    NonNumeric {
        /// Metric column.
        column: String,
        /// Row index.
        position: usize,
        /// Rendered cell value.
        value: String,
    },

    /// Explicit bounds are inverted.
    #[error("Invalid spine bounds: {min} > {max}")]
    InvalidBounds {
        /// Lower bound.
        min: String,
        /// Upper bound.
        max: String,
    },

    /// Reconcile rule cannot be applied.
    #[error("Invalid reconcile rule: {message}")]
    InvalidRule {
        /// Details.
        message: String,
    },
}

impl PipelineError {
    /// Stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            Self::EmptySeries { .. } => ErrorCode::EmptySeries,
            Self::UnorderedOrDuplicateKey { .. } => ErrorCode::UnorderedOrDuplicateKey,
            Self::ColumnNotFound { .. } => ErrorCode::ColumnNotFound,
            Self::InvalidPeriodKey { .. } => ErrorCode::InvalidPeriodKey,
            Self::NonNumeric { .. } => ErrorCode::NonNumeric,
            Self::InvalidBounds { .. } => ErrorCode::InvalidBounds,
            Self::InvalidRule { .. } => ErrorCode::InvalidRule,
        }
    }

    pub(crate) fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    pub(crate) fn rule(message: impl Into<String>) -> Self {
        Self::InvalidRule {
            message: message.into(),
        }
    }
}
