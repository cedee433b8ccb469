//! Planning logic for loading purchase orders onto pallets.
//!
//! The planner runs five stages, each a pure function of the previous one:
//! 1. expand order lines into cartons
//! 2. derive pallet capacity from the height limit
//! 3. allocate per-pallet carton targets
//! 4. assign carton groups to pallets (largest first, first fit, then split)
//! 5. build layers and estimate weight and height per pallet
//!
//! Stage 4 is a greedy heuristic. It keeps groups together when a whole group
//! fits on some pallet and otherwise fills pallets in order; it does not search
//! for an optimal packing.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PlanError, Result};
use crate::layout::build_layers;
use crate::metrics::{dims_label, estimated_height, estimated_weight};
use crate::model::{Carton, Grouping, Pallet, PalletPlan, PlanTotals, PurchaseOrder, Settings};
use crate::types::{BOX_HEIGHT, MAX_BOXES_PER_LAYER, PALLET_DECK_HEIGHT, min_pallet_height};

/// Configuration for the planner.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlannerConfig {
    /// Upper bound on cartons one invocation may expand.
    pub max_cartons: u64,
    /// Settings applied where a request leaves fields out.
    pub default_settings: Settings,
}

impl PlannerConfig {
    pub const DEFAULT_MAX_CARTONS: u64 = 100_000;

    /// Creates a builder for custom configuration.
    pub fn builder() -> PlannerConfigBuilder {
        PlannerConfigBuilder::default()
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_cartons: Self::DEFAULT_MAX_CARTONS,
            default_settings: Settings::default(),
        }
    }
}

/// Builder for [`PlannerConfig`].
#[derive(Clone, Debug, Default)]
pub struct PlannerConfigBuilder {
    config: PlannerConfig,
}

impl PlannerConfigBuilder {
    pub fn max_cartons(mut self, limit: u64) -> Self {
        self.config.max_cartons = limit;
        self
    }

    pub fn default_max_pallet_height(mut self, height: f64) -> Self {
        self.config.default_settings.max_pallet_height = height;
        self
    }

    pub fn default_grouping(mut self, grouping: Grouping) -> Self {
        self.config.default_settings.grouping = grouping;
        self
    }

    pub fn build(self) -> PlannerConfig {
        self.config
    }
}

/// Per-pallet capacity derived from the height limit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Capacity {
    pub max_layers: usize,
    /// Maximum cartons per pallet.
    pub cartons: usize,
}

/// Derives how many layers and cartons fit under `max_pallet_height`.
///
/// Fails when the height leaves no room for a single layer, or allows more
/// cartons per pallet than fit in a `usize`.
pub fn plan_capacity(max_pallet_height: f64) -> Result<Capacity> {
    let usable_height = max_pallet_height - PALLET_DECK_HEIGHT as f64;
    let max_layers = (usable_height / BOX_HEIGHT as f64).floor();
    if max_layers.is_nan() || max_layers < 1.0 {
        return Err(PlanError::HeightTooLow {
            max_pallet_height,
            minimum: min_pallet_height() as f64,
        });
    }
    // `as` saturates, so anything out of range fails the multiplication below
    let max_layers = max_layers as usize;
    let cartons = max_layers
        .checked_mul(MAX_BOXES_PER_LAYER)
        .ok_or(PlanError::HeightTooHigh { max_pallet_height })?;
    Ok(Capacity { max_layers, cartons })
}

/// Total cartons the orders expand to, saturating on overflow.
pub fn count_cartons(orders: &[PurchaseOrder]) -> u64 {
    orders
        .iter()
        .flat_map(|order| order.lines.iter())
        .fold(0u64, |sum, line| sum.saturating_add(line.carton_count()))
}

fn check_carton_limit(orders: &[PurchaseOrder], max_cartons: u64) -> Result<u64> {
    let requested = count_cartons(orders);
    if requested > max_cartons {
        return Err(PlanError::TooManyCartons {
            requested,
            limit: max_cartons,
        });
    }
    Ok(requested)
}

/// Checks the height limit and order volume without expanding anything.
pub fn preflight(
    orders: &[PurchaseOrder],
    settings: Settings,
    config: PlannerConfig,
) -> Result<Capacity> {
    let capacity = plan_capacity(settings.max_pallet_height)?;
    check_carton_limit(orders, config.max_cartons)?;
    Ok(capacity)
}

/// Explodes order lines into cartons tagged with their group key.
///
/// The total is checked against `max_cartons` before anything is allocated.
pub fn expand_cartons(
    orders: &[PurchaseOrder],
    grouping: Grouping,
    max_cartons: u64,
) -> Result<Vec<Carton>> {
    let requested = check_carton_limit(orders, max_cartons)?;

    let mut cartons = Vec::with_capacity(requested as usize);
    for order in orders {
        for line in &order.lines {
            let group_key = grouping.group_key(&order.po, &line.sku);
            for _ in 0..line.carton_count() {
                cartons.push(Carton {
                    id: cartons.len(),
                    po: order.po.clone(),
                    sku: line.sku.clone(),
                    units_per_box: line.units_per_box,
                    group_key: group_key.clone(),
                });
            }
        }
    }
    Ok(cartons)
}

/// Splits `total` cartons into per-pallet targets.
///
/// Targets prefer whole layers, sum exactly to `total` and never exceed
/// `capacity`. Extra cartons land on the last pallets.
pub fn allocate_targets(total: usize, capacity: usize) -> Vec<usize> {
    if total == 0 || capacity == 0 {
        return Vec::new();
    }

    let pallet_count = total.div_ceil(capacity);
    let layer = MAX_BOXES_PER_LAYER;
    let base = (total / pallet_count / layer * layer).max(layer);
    let mut targets = vec![base; pallet_count];

    let assigned = base * pallet_count;
    if assigned <= total {
        let mut leftover = total - assigned;
        for target in targets.iter_mut().rev() {
            if leftover == 0 {
                break;
            }
            let add = leftover.min(layer);
            *target += add;
            leftover -= add;
        }
    } else {
        // the one-layer floor overshoots; take the surplus back from the end
        let mut surplus = assigned - total;
        for target in targets.iter_mut().rev() {
            if surplus == 0 {
                break;
            }
            let cut = surplus.min(*target);
            *target -= cut;
            surplus -= cut;
        }
    }
    targets
}

/// Groups cartons by key, largest group first.
///
/// Groups of equal size keep the order in which their key first appeared, and
/// cartons keep their expansion order within a group.
pub fn group_cartons(cartons: Vec<Carton>) -> Vec<Vec<Carton>> {
    let mut by_key: IndexMap<String, Vec<Carton>> = IndexMap::new();
    for carton in cartons {
        by_key
            .entry(carton.group_key.clone())
            .or_default()
            .push(carton);
    }
    let mut groups: Vec<Vec<Carton>> = by_key.into_values().collect();
    groups.sort_by(|a, b| b.len().cmp(&a.len()));
    groups
}

/// Assigns carton groups to pallets without exceeding any target.
///
/// Each group goes whole onto the first pallet with enough room left. A group
/// that fits nowhere is split, filling pallets in order from the first one.
/// Requires `targets` to sum to at least the number of cartons; any excess is
/// put on the last pallet so no carton is lost.
pub fn assign_groups(groups: Vec<Vec<Carton>>, targets: &[usize]) -> Vec<Vec<Carton>> {
    let mut pallets: Vec<Vec<Carton>> = targets.iter().map(|t| Vec::with_capacity(*t)).collect();
    if pallets.is_empty() {
        return pallets;
    }

    for group in groups {
        let whole_fit = pallets
            .iter()
            .zip(targets)
            .position(|(pallet, target)| pallet.len() + group.len() <= *target);
        if let Some(idx) = whole_fit {
            pallets[idx].extend(group);
            continue;
        }

        let mut remaining = group.into_iter();
        for (pallet, target) in pallets.iter_mut().zip(targets) {
            let room = target.saturating_sub(pallet.len());
            pallet.extend(remaining.by_ref().take(room));
        }

        let overflow: Vec<Carton> = remaining.collect();
        if !overflow.is_empty() {
            warn!(
                "⚠️ Pallet targets too small, {} cartons added to the last pallet",
                overflow.len()
            );
            if let Some(last) = pallets.last_mut() {
                last.extend(overflow);
            }
        }
    }
    pallets
}

/// Builds the layered layout and metrics for one pallet.
pub fn build_pallet(pallet_number: usize, cartons: &[Carton], grouping: Grouping) -> Pallet {
    let layers = build_layers(cartons, grouping);
    let height = estimated_height(layers.len());

    let (layer_breakdown, layer_layout) = layers
        .into_iter()
        .map(|layer| (layer.breakdown, layer.mapping))
        .unzip::<_, _, Vec<_>, Vec<_>>();

    Pallet {
        pallet_number,
        box_count: cartons.len(),
        layers: layer_layout.len(),
        estimated_height: height,
        estimated_weight: estimated_weight(cartons),
        dims: dims_label(height),
        layer_breakdown,
        layer_layout,
    }
}

/// Plans pallets with the default configuration.
pub fn plan_pallets(orders: &[PurchaseOrder], settings: Settings) -> Result<PalletPlan> {
    plan_pallets_with_config(orders, settings, PlannerConfig::default())
}

/// Plans pallets with a custom configuration.
pub fn plan_pallets_with_config(
    orders: &[PurchaseOrder],
    settings: Settings,
    config: PlannerConfig,
) -> Result<PalletPlan> {
    plan_pallets_with_progress(orders, settings, config, |_| {})
}

/// Events emitted while planning, for live progress reporting.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PlanEvent {
    /// Capacity and targets are known.
    PlanStarted {
        cartons: usize,
        pallets: usize,
        capacity: usize,
        targets: Vec<usize>,
    },
    /// A pallet has been laid out.
    PalletPlanned { pallet: Pallet },
    /// Planning is complete.
    Finished { totals: PlanTotals },
}

/// Plans pallets and reports each step through `on_event`.
///
/// Errors are returned before any event is emitted.
pub fn plan_pallets_with_progress(
    orders: &[PurchaseOrder],
    settings: Settings,
    config: PlannerConfig,
    mut on_event: impl FnMut(&PlanEvent),
) -> Result<PalletPlan> {
    let capacity = preflight(orders, settings, config)?;
    let cartons = expand_cartons(orders, settings.grouping, config.max_cartons)?;
    let total = cartons.len();

    let targets = allocate_targets(total, capacity.cartons);
    debug!(
        "Capacity {} cartons ({} layers), {} cartons, targets {:?}",
        capacity.cartons, capacity.max_layers, total, targets
    );
    on_event(&PlanEvent::PlanStarted {
        cartons: total,
        pallets: targets.len(),
        capacity: capacity.cartons,
        targets: targets.clone(),
    });

    let groups = group_cartons(cartons);
    debug!("{} groups ({})", groups.len(), settings.grouping);
    let assignments = assign_groups(groups, &targets);

    let pallets: Vec<Pallet> = assignments
        .iter()
        .enumerate()
        .map(|(idx, cartons)| {
            let pallet = build_pallet(idx + 1, cartons, settings.grouping);
            on_event(&PlanEvent::PalletPlanned {
                pallet: pallet.clone(),
            });
            pallet
        })
        .collect();

    let plan = PalletPlan::from_pallets(pallets);
    on_event(&PlanEvent::Finished {
        totals: plan.totals,
    });
    Ok(plan)
}
