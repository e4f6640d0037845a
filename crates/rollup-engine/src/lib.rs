//! rollup-engine - Estimate Rollup & Aggregation Engine
//!
//! Turns an estimate's line-item forest into a single consistent `stats`
//! snapshot. The pipeline runs leaf to root:
//!
//! 1. [`arena`] indexes line items and validates the parent forest
//! 2. [`quantity`] resolves every quantity (literal, formula, child sum)
//! 3. [`cost`] composes unit costs and line totals
//! 4. [`assembly`] folds children into their assemblies
//! 5. [`allocation`] spreads cost across use groups
//! 6. [`markup`] layers ordered markups on top
//! 7. [`aggregator`] sequences the above and produces the stats
//!
//! [`preview`] reruns steps 1-5 on a single edited branch.

pub mod aggregator;
pub mod allocation;
pub mod arena;
pub mod assembly;
pub mod breakdown;
pub mod catalog;
pub mod cost;
pub mod error;
pub mod markup;
pub mod preview;
pub mod quantity;

pub use aggregator::{compute_stats, sort_reference_issues, Aggregator, ComputedStats};
pub use allocation::allocate_use_groups;
pub use arena::LineItemArena;
pub use assembly::{AssemblyRollup, NodeRollup};
pub use breakdown::{describe_classification, ClassificationRow};
pub use catalog::ProductIndex;
pub use cost::{compose_cost, effective_unit_cost, ComposedCost};
pub use error::{AggregationError, AggregationResult, ReferenceKind};
pub use markup::{apply_markups, MarkupOutcome};
pub use preview::{branch_items, preview_aggregate, PreviewContext, SubtreeStats};
pub use quantity::resolve_quantities;
