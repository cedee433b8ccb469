//! Weight, height and footprint estimates for a planned pallet.

use crate::model::Carton;
use crate::types::{
    BOX_HEIGHT, BOX_WEIGHT, DEFAULT_UNITS_PER_BOX, PALLET_DEAD_WEIGHT, PALLET_DECK_HEIGHT,
    PALLET_FOOTPRINT,
};

/// Estimated gross weight in pounds, rounded to the nearest pound.
///
/// Each carton weighs the reference box weight scaled linearly by its units.
pub fn estimated_weight(cartons: &[Carton]) -> u64 {
    let cartons_weight: f64 = cartons
        .iter()
        .map(|c| (c.units_per_box as f64 / DEFAULT_UNITS_PER_BOX as f64) * BOX_WEIGHT)
        .sum();
    (PALLET_DEAD_WEIGHT + cartons_weight).round() as u64
}

/// Height in inches of a pallet with `layer_count` layers, deck included.
pub fn estimated_height(layer_count: usize) -> u64 {
    PALLET_DECK_HEIGHT + layer_count as u64 * BOX_HEIGHT
}

/// Dimension string `WxLxH` in inches.
pub fn dims_label(height: u64) -> String {
    let (width, length) = PALLET_FOOTPRINT;
    format!("{}x{}x{}", width, length, height)
}
