//! rollup-core - Core library for estimate rollup
//!
//! This crate provides the typed estimate records (line items, markups, use
//! groups, products, sort taxonomies), the snapshot bundle the engine runs
//! over, the formula and classification collaborator traits, rollup
//! configuration, and the `stats` output types shared by every other crate.

pub mod classification;
pub mod config;
pub mod error;
pub mod estimate;
pub mod formula;
pub mod ids;
pub mod line_item;
pub mod product;
pub(crate) mod serde_helpers;
pub mod snapshot;
pub mod sort;
pub mod stats;

pub use classification::{
    ClassificationCodes, ClassificationLookup, ClassificationNode, ClassificationScheme,
    StaticClassificationLookup,
};
pub use config::{ClassificationDepth, FormulaVariableConfig, RollupConfig};
pub use error::{CoreError, CoreResult};
pub use estimate::{Estimate, EstimateMarkup, EstimateUseGroup, MarkupSource};
pub use formula::{FormulaError, FormulaEvaluator, FormulaResult, QuantityFormula};
pub use ids::{
    AlternateId, EstimateId, EstimateUseGroupId, LineItemId, MarkupId, ProductId, ProjectId,
    SortCodeId, SortFieldId, UseGroupId,
};
pub use line_item::{LineItem, UnitCosts};
pub use product::{Product, ProductConfig};
pub use snapshot::EstimateSnapshot;
pub use sort::{SortCatalog, SortCode, SortField};
pub use stats::{
    ClassificationTotals, EstimateStats, MarkupContribution, MarkupKind, UseGroupKey,
    UseGroupSummary, UNASSIGNED, UNCLASSIFIED,
};
