//! Physical constants, the layer coordinate pattern and numeric input parsing.
//!
//! Everything here is shared by the planning stages and the request models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{PlanError, Result};

/// Height of one carton in inches.
pub const BOX_HEIGHT: u64 = 14;

/// Height of the empty pallet deck in inches.
pub const PALLET_DECK_HEIGHT: u64 = 6;

/// Cartons per layer (2 × 3 footprint).
pub const MAX_BOXES_PER_LAYER: usize = 6;

/// Reference carton weight in lbs at [`DEFAULT_UNITS_PER_BOX`] units.
pub const BOX_WEIGHT: f64 = 14.5;

/// Pallet and packaging allowance in lbs.
pub const PALLET_DEAD_WEIGHT: f64 = 35.0;

/// Units per carton when a line leaves the field empty or zero.
pub const DEFAULT_UNITS_PER_BOX: u64 = 50;

/// Height limit used when settings omit one.
pub const DEFAULT_MAX_PALLET_HEIGHT: f64 = 93.0;

/// Pallet footprint (width × length) in inches.
pub const PALLET_FOOTPRINT: (u64, u64) = (40, 48);

/// Smallest height limit that still fits one layer.
pub const fn min_pallet_height() -> u64 {
    PALLET_DECK_HEIGHT + BOX_HEIGHT
}

/// Slot position within a layer.
///
/// Rows `a` and `b` run along the long side of the pallet; columns 1 to 3 across.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Coordinate {
    A1,
    A2,
    A3,
    B3,
    B2,
    B1,
}

impl Coordinate {
    /// Snake order applied identically to every layer, so slot `i` of one
    /// layer always sits on slot `i` of the layer below.
    pub const SNAKE: [Coordinate; MAX_BOXES_PER_LAYER] = [
        Coordinate::A1,
        Coordinate::A2,
        Coordinate::A3,
        Coordinate::B3,
        Coordinate::B2,
        Coordinate::B1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Coordinate::A1 => "a1",
            Coordinate::A2 => "a2",
            Coordinate::A3 => "a3",
            Coordinate::B3 => "b3",
            Coordinate::B2 => "b2",
            Coordinate::B1 => "b1",
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric field as it arrives over the wire: a JSON number or a string.
///
/// Form inputs submit `"300"` just as often as `300`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl NumericInput {
    /// Returns `true` for an empty or whitespace-only string.
    pub fn is_blank(&self) -> bool {
        matches!(self, NumericInput::Text(raw) if raw.trim().is_empty())
    }

    /// Parses the value into a float without range checks.
    pub fn to_f64(&self, field: &str) -> Result<f64> {
        match self {
            NumericInput::Number(value) => Ok(*value),
            NumericInput::Text(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| PlanError::invalid_number(field, raw, "not a number")),
        }
    }
}

impl From<u64> for NumericInput {
    fn from(value: u64) -> Self {
        NumericInput::Number(value as f64)
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

/// Validation helpers for numeric fields.
pub mod validation {
    use super::NumericInput;
    use crate::error::{PlanError, Result};

    /// Largest integer an `f64` represents exactly.
    const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

    /// Validates a whole, non-negative count such as a quantity.
    pub fn validate_count(input: &NumericInput, field: &str) -> Result<u64> {
        let value = input.to_f64(field)?;
        if !value.is_finite() {
            return Err(PlanError::invalid_number(field, value, "must be finite"));
        }
        if value < 0.0 {
            return Err(PlanError::invalid_number(field, value, "must not be negative"));
        }
        if value.fract() != 0.0 {
            return Err(PlanError::invalid_number(field, value, "must be a whole number"));
        }
        if value > MAX_EXACT_INTEGER {
            return Err(PlanError::invalid_number(field, value, "is too large"));
        }
        Ok(value as u64)
    }

    /// Validates a strictly positive, finite measurement such as a height.
    pub fn validate_positive(input: &NumericInput, field: &str) -> Result<f64> {
        let value = input.to_f64(field)?;
        if value.is_nan() || value.is_infinite() {
            return Err(PlanError::invalid_number(field, value, "must be finite"));
        }
        if value <= 0.0 {
            return Err(PlanError::invalid_number(field, value, "must be positive"));
        }
        Ok(value)
    }
}
