//! Layer synthesis for a single pallet.
//!
//! Cartons are ordered by label frequency (most common first), chunked into
//! layers of six and assigned the snake coordinates positionally. Every layer
//! uses the same coordinate order so the slots form stable vertical columns.

use indexmap::IndexMap;

use crate::model::{Carton, Grouping, Layer, LayerSlot};
use crate::types::{Coordinate, MAX_BOXES_PER_LAYER};

/// Counts cartons per display label, ordered by descending count.
///
/// Labels with the same count keep the order in which they were first seen.
pub fn label_frequencies(cartons: &[Carton], grouping: Grouping) -> Vec<(String, usize)> {
    let mut freq: IndexMap<String, usize> = IndexMap::new();
    for carton in cartons {
        *freq
            .entry(grouping.display_label(&carton.po, &carton.sku))
            .or_insert(0) += 1;
    }

    let mut ordered: Vec<(String, usize)> = freq.into_iter().collect();
    // stable: ties stay in first-seen order
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    ordered
}

/// Arranges one pallet's cartons into layers.
pub fn build_layers(cartons: &[Carton], grouping: Grouping) -> Vec<Layer> {
    let flat: Vec<String> = label_frequencies(cartons, grouping)
        .into_iter()
        .flat_map(|(label, count)| std::iter::repeat_n(label, count))
        .collect();

    flat.chunks(MAX_BOXES_PER_LAYER)
        .map(|chunk| {
            let mut layer = Layer::default();
            for (label, coordinate) in chunk.iter().zip(Coordinate::SNAKE) {
                *layer.breakdown.entry(label.clone()).or_insert(0) += 1;
                layer.mapping.push(LayerSlot {
                    coordinate,
                    sku: label.clone(),
                });
            }
            layer
        })
        .collect()
}
