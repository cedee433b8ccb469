//! Error types for pallet planning.
//!
//! Every error is terminal for the invocation that raised it and carries the
//! field path and offending value so callers can correct their input.

use thiserror::Error;

/// Result type alias for planning operations.
pub type Result<T> = std::result::Result<T, PlanError>;

/// Broad error category, used to pick response codes and log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Settings that make planning impossible.
    Configuration,
    /// Order data that cannot be interpreted.
    InvalidInput,
}

/// Errors that can occur while validating input or planning pallets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// The height limit leaves no room for a single layer of cartons.
    #[error(
        "Configuration error: maxPalletHeight = {max_pallet_height} fits no layer (at least {minimum} inches required)"
    )]
    HeightTooLow { max_pallet_height: f64, minimum: f64 },

    /// The height limit yields more cartons per pallet than can be counted.
    #[error("Configuration error: maxPalletHeight = {max_pallet_height} is too large to plan")]
    HeightTooHigh { max_pallet_height: f64 },

    /// Grouping mode outside of `none`, `item` and `po-item`.
    #[error("Configuration error: grouping = '{0}' is not one of none, item, po-item")]
    UnknownGrouping(String),

    /// A numeric field is missing, unparsable or out of range.
    #[error("Invalid input: {field} = '{value}': {reason}")]
    InvalidNumber {
        field: String,
        value: String,
        reason: String,
    },

    /// Expansion would exceed the configured carton limit.
    #[error("Invalid input: orders expand to {requested} cartons, limit is {limit}")]
    TooManyCartons { requested: u64, limit: u64 },
}

impl PlanError {
    pub(crate) fn invalid_number(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        PlanError::InvalidNumber {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::HeightTooLow { .. }
            | PlanError::HeightTooHigh { .. }
            | PlanError::UnknownGrouping(_) => ErrorKind::Configuration,
            PlanError::InvalidNumber { .. } | PlanError::TooManyCartons { .. } => {
                ErrorKind::InvalidInput
            }
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::HeightTooLow { .. } => "height_too_low",
            PlanError::HeightTooHigh { .. } => "height_too_high",
            PlanError::UnknownGrouping(_) => "unknown_grouping",
            PlanError::InvalidNumber { .. } => "invalid_number",
            PlanError::TooManyCartons { .. } => "too_many_cartons",
        }
    }
}
