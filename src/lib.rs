//! Pallet planning for warehouse purchase orders.
//!
//! Turns purchase-order lines into cartons and plans them onto pallets under a
//! height limit, keeping cartons of the same group together where possible.
//!
//! ```
//! use pallet_planner::model::{Grouping, OrderLine, PurchaseOrder, Settings};
//! use pallet_planner::planner::plan_pallets;
//!
//! let orders = vec![PurchaseOrder::new("PO1", vec![OrderLine::new("A", 300, Some(50))])];
//! let settings = Settings::new(93.0, Grouping::PoItem).unwrap();
//! let plan = plan_pallets(&orders, settings).unwrap();
//!
//! assert_eq!(plan.totals.pallets, 1);
//! assert_eq!(plan.pallets[0].dims, "40x48x20");
//! assert_eq!(plan.pallets[0].estimated_weight, 122);
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod planner;
pub mod types;

pub use error::{PlanError, Result};
pub use model::{Grouping, OrderLine, PalletPlan, PurchaseOrder, Settings};
pub use planner::{PlannerConfig, plan_pallets, plan_pallets_with_config};
