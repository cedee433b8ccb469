//! Data models for pallet planning.
//!
//! This module defines the data structures that flow through the planner:
//! - `PurchaseOrder` / `OrderLine`: validated order input
//! - `Settings` / `Grouping`: how to plan
//! - `Carton`: one physical box produced by expansion
//! - `Pallet`, `Layer`, `LayerSlot`: the planned layout
//! - `PalletPlan`: the pallets plus totals and summaries
//!
//! Raw wire shapes (`*Input`) are converted into the validated types through
//! `into_validated`, which reports the exact field path on failure.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::error::{PlanError, Result};
use crate::types::validation::{validate_count, validate_positive};
use crate::types::{Coordinate, DEFAULT_MAX_PALLET_HEIGHT, DEFAULT_UNITS_PER_BOX, NumericInput};

/// How cartons are kept together on pallets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Grouping {
    /// Any carton may sit next to any other.
    None,
    /// Cartons of the same SKU stay together across orders.
    Item,
    /// Cartons of the same SKU within the same order stay together.
    #[default]
    PoItem,
}

impl Grouping {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grouping::None => "none",
            Grouping::Item => "item",
            Grouping::PoItem => "po-item",
        }
    }

    /// Key deciding which cartons belong together.
    pub fn group_key(&self, po: &str, sku: &str) -> String {
        match self {
            Grouping::None => "mixed".to_string(),
            Grouping::Item => sku.to_string(),
            Grouping::PoItem => format!("{}-{}", po, sku),
        }
    }

    /// Label shown for a carton in layer breakdowns and layouts.
    pub fn display_label(&self, po: &str, sku: &str) -> String {
        match self {
            Grouping::PoItem if !po.is_empty() => format!("{}-{}", po, sku),
            _ => sku.to_string(),
        }
    }
}

impl FromStr for Grouping {
    type Err = PlanError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "none" => Ok(Grouping::None),
            "item" => Ok(Grouping::Item),
            "po-item" => Ok(Grouping::PoItem),
            other => Err(PlanError::UnknownGrouping(other.to_string())),
        }
    }
}

impl std::fmt::Display for Grouping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated planning settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub max_pallet_height: f64,
    pub grouping: Grouping,
}

impl Settings {
    /// Creates settings after checking the height is a positive, finite number.
    ///
    /// Whether the height fits a layer is checked by the capacity planner.
    pub fn new(max_pallet_height: f64, grouping: Grouping) -> Result<Self> {
        let max_pallet_height =
            validate_positive(&NumericInput::Number(max_pallet_height), "maxPalletHeight")?;
        Ok(Self {
            max_pallet_height,
            grouping,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_pallet_height: DEFAULT_MAX_PALLET_HEIGHT,
            grouping: Grouping::default(),
        }
    }
}

/// One validated order line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderLine {
    pub sku: String,
    pub quantity: u64,
    pub units_per_box: u64,
}

impl OrderLine {
    /// Creates a line; a zero or missing `units_per_box` falls back to the default.
    ///
    /// # Examples
    /// ```
    /// use pallet_planner::model::OrderLine;
    ///
    /// let line = OrderLine::new("A", 120, None);
    /// assert_eq!(line.units_per_box, 50);
    /// assert_eq!(line.carton_count(), 3);
    /// ```
    pub fn new(sku: impl Into<String>, quantity: u64, units_per_box: Option<u64>) -> Self {
        let units_per_box = match units_per_box {
            Some(units) if units > 0 => units,
            _ => DEFAULT_UNITS_PER_BOX,
        };
        Self {
            sku: sku.into(),
            quantity,
            units_per_box,
        }
    }

    /// Number of cartons needed for this line: `ceil(quantity / units_per_box)`.
    pub fn carton_count(&self) -> u64 {
        self.quantity.div_ceil(self.units_per_box)
    }
}

/// One validated purchase order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseOrder {
    pub po: String,
    pub lines: Vec<OrderLine>,
}

impl PurchaseOrder {
    pub fn new(po: impl Into<String>, lines: Vec<OrderLine>) -> Self {
        Self {
            po: po.into(),
            lines,
        }
    }
}

/// Order line as submitted by a client.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    #[schema(value_type = Option<f64>, example = json!(300))]
    pub quantity: Option<NumericInput>,
    #[serde(default)]
    #[schema(value_type = Option<f64>, example = json!(50))]
    pub units_per_box: Option<NumericInput>,
}

impl OrderLineInput {
    /// Validates the line; `path` prefixes field names in error messages.
    pub fn into_validated(self, path: &str) -> Result<OrderLine> {
        let quantity_field = format!("{}.quantity", path);
        let quantity = match &self.quantity {
            Some(raw) if !raw.is_blank() => validate_count(raw, &quantity_field)?,
            _ => {
                return Err(PlanError::invalid_number(
                    quantity_field,
                    "",
                    "is required",
                ));
            }
        };

        let units_field = format!("{}.unitsPerBox", path);
        let units_per_box = match &self.units_per_box {
            Some(raw) if !raw.is_blank() => Some(validate_count(raw, &units_field)?),
            _ => None,
        };

        Ok(OrderLine::new(self.sku, quantity, units_per_box))
    }
}

/// Purchase order as submitted by a client.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderInput {
    #[serde(default)]
    pub po: String,
    #[serde(default, alias = "skus")]
    pub lines: Vec<OrderLineInput>,
}

impl PurchaseOrderInput {
    /// Validates the order found at position `index` of the request.
    pub fn into_validated(self, index: usize) -> Result<PurchaseOrder> {
        let lines = self
            .lines
            .into_iter()
            .enumerate()
            .map(|(line_idx, line)| {
                line.into_validated(&format!("orders[{}].lines[{}]", index, line_idx))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PurchaseOrder::new(self.po, lines))
    }
}

/// Settings as submitted by a client; absent fields fall back to defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInput {
    #[serde(default)]
    #[schema(value_type = Option<f64>, example = json!(93))]
    pub max_pallet_height: Option<NumericInput>,
    #[serde(default)]
    #[schema(example = "po-item")]
    pub grouping: Option<String>,
}

impl SettingsInput {
    /// Validates the settings, filling gaps from `defaults`.
    pub fn into_validated(self, defaults: Settings) -> Result<Settings> {
        let max_pallet_height = match &self.max_pallet_height {
            Some(raw) if !raw.is_blank() => validate_positive(raw, "maxPalletHeight")?,
            _ => defaults.max_pallet_height,
        };
        let grouping = match self.grouping.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => defaults.grouping,
        };
        Settings::new(max_pallet_height, grouping)
    }
}

/// Validates every order of a request, stopping at the first error.
pub fn validate_orders(orders: Vec<PurchaseOrderInput>) -> Result<Vec<PurchaseOrder>> {
    orders
        .into_iter()
        .enumerate()
        .map(|(idx, order)| order.into_validated(idx))
        .collect()
}

/// One physical carton.
///
/// Cartons are never merged or split once expanded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Carton {
    /// Sequence number in expansion order.
    pub id: usize,
    pub po: String,
    pub sku: String,
    pub units_per_box: u64,
    pub group_key: String,
}

/// A coordinate within a layer and the label of the carton occupying it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct LayerSlot {
    pub coordinate: Coordinate,
    /// Display label of the carton (SKU or `po-SKU`).
    pub sku: String,
}

/// One horizontal tier of at most six cartons.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layer {
    pub breakdown: IndexMap<String, usize>,
    pub mapping: Vec<LayerSlot>,
}

impl Layer {
    pub fn carton_count(&self) -> usize {
        self.mapping.len()
    }
}

/// A planned pallet.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pallet {
    /// 1-based position in the plan.
    pub pallet_number: usize,
    pub box_count: usize,
    /// Number of layers.
    pub layers: usize,
    /// Inches, deck included.
    pub estimated_height: u64,
    /// Pounds, rounded.
    pub estimated_weight: u64,
    /// Width × length × height in inches, e.g. `40x48x20`.
    #[schema(example = "40x48x20")]
    pub dims: String,
    pub layer_breakdown: Vec<IndexMap<String, usize>>,
    pub layer_layout: Vec<Vec<LayerSlot>>,
}

/// Compact per-pallet record for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PalletSummary {
    pub pallet: usize,
    pub cartons: usize,
    pub dims: String,
    pub weight: u64,
}

impl From<&Pallet> for PalletSummary {
    fn from(pallet: &Pallet) -> Self {
        Self {
            pallet: pallet.pallet_number,
            cartons: pallet.box_count,
            dims: pallet.dims.clone(),
            weight: pallet.estimated_weight,
        }
    }
}

/// Aggregate figures across all pallets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlanTotals {
    pub pallets: usize,
    pub cartons: usize,
    pub weight: u64,
}

impl PlanTotals {
    pub fn from_pallets(pallets: &[Pallet]) -> Self {
        Self {
            pallets: pallets.len(),
            cartons: pallets.iter().map(|p| p.box_count).sum(),
            weight: pallets.iter().map(|p| p.estimated_weight).sum(),
        }
    }
}

/// Complete result of a planning run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct PalletPlan {
    pub pallets: Vec<Pallet>,
    pub totals: PlanTotals,
    pub summaries: Vec<PalletSummary>,
}

impl PalletPlan {
    /// Wraps finished pallets with totals and summaries.
    pub fn from_pallets(pallets: Vec<Pallet>) -> Self {
        let totals = PlanTotals::from_pallets(&pallets);
        let summaries = pallets.iter().map(PalletSummary::from).collect();
        Self {
            pallets,
            totals,
            summaries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pallets.is_empty()
    }

    pub fn pallet_count(&self) -> usize {
        self.pallets.len()
    }
}
