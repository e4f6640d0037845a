//! The immutable input bundle for one aggregation run

use crate::estimate::{Estimate, EstimateMarkup, EstimateUseGroup};
use crate::line_item::LineItem;
use crate::product::Product;
use crate::sort::{SortCatalog, SortCode, SortField};
use serde::{Deserialize, Serialize};

/// Everything the engine reads for one estimate, fetched before the run starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateSnapshot {
    pub estimate: Estimate,

    #[serde(default)]
    pub line_items: Vec<LineItem>,

    #[serde(default)]
    pub markups: Vec<EstimateMarkup>,

    #[serde(default)]
    pub use_groups: Vec<EstimateUseGroup>,

    /// Products referenced by the line items
    #[serde(default)]
    pub products: Vec<Product>,

    #[serde(default)]
    pub sort_fields: Vec<SortField>,

    #[serde(default)]
    pub sort_codes: Vec<SortCode>,
}

impl EstimateSnapshot {
    pub fn new(estimate: Estimate) -> Self {
        Self {
            estimate,
            line_items: Vec::new(),
            markups: Vec::new(),
            use_groups: Vec::new(),
            products: Vec::new(),
            sort_fields: Vec::new(),
            sort_codes: Vec::new(),
        }
    }

    pub fn sort_catalog(&self) -> SortCatalog {
        SortCatalog::new(&self.sort_fields, &self.sort_codes)
    }
}
