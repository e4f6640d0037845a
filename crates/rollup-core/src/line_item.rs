//! Line item records
//!
//! A line item is one priced row of an estimate, created from a catalog
//! product. Line items form an assembly forest through `parent`.

use crate::classification::ClassificationCodes;
use crate::formula::QuantityFormula;
use crate::ids::{
    AlternateId, EstimateId, EstimateUseGroupId, LineItemId, ProductId, SortCodeId, SortFieldId,
};
use crate::serde_helpers::{empty_object_as_none, null_as_default, optional_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unit-cost components of a line item.
///
/// `None` means the component was never entered; the cost composer treats it
/// as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitCosts {
    #[serde(default)]
    pub material_uc: Option<f64>,
    #[serde(default)]
    pub labor_uc: Option<f64>,
    #[serde(default)]
    pub equip_uc: Option<f64>,
    #[serde(default)]
    pub sub_uc: Option<f64>,
    #[serde(default)]
    pub other_uc: Option<f64>,

    /// Manually entered total unit cost; overrides the component sum when set
    #[serde(default)]
    pub total_uc: Option<f64>,
}

impl UnitCosts {
    /// The five components, in export order
    pub fn components(&self) -> [Option<f64>; 5] {
        [
            self.material_uc,
            self.labor_uc,
            self.equip_uc,
            self.sub_uc,
            self.other_uc,
        ]
    }
}

/// A line item as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,

    pub estimate: EstimateId,

    /// Catalog product this item was created from
    #[serde(default)]
    pub product: Option<ProductId>,

    /// Lineage: the product the item was originally copied from
    #[serde(default)]
    pub product_original: Option<ProductId>,

    /// Parent assembly line item
    #[serde(default)]
    pub parent: Option<LineItemId>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub uom: Option<String>,

    /// Sort key among siblings (e.g. `01000.001`)
    #[serde(default)]
    pub order: Option<String>,

    /// Literal quantity; `None` when the quantity is derived
    #[serde(default)]
    pub quantity: Option<f64>,

    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub quantity_formula: Option<QuantityFormula>,

    #[serde(flatten)]
    pub costs: UnitCosts,

    /// Stored total cost; informational only, always recomputed
    #[serde(default)]
    pub total_cost: Option<f64>,

    /// Estimate use group → percent of this item's cost
    #[serde(default, deserialize_with = "null_as_default")]
    pub estimate_use_groups: BTreeMap<EstimateUseGroupId, f64>,

    /// When true this item's quantity is the assembly quantity
    #[serde(default, deserialize_with = "null_as_default")]
    pub selected_traditional_assembly: bool,

    /// Sort field → sort code
    #[serde(default, deserialize_with = "null_as_default")]
    pub extras: BTreeMap<SortFieldId, SortCodeId>,

    #[serde(default)]
    pub mf: ClassificationCodes,

    #[serde(default)]
    pub uf: ClassificationCodes,

    #[serde(default)]
    pub alternate: Option<AlternateId>,

    #[serde(default, deserialize_with = "optional_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl LineItem {
    /// Minimal line item, mainly for builders and tests
    pub fn new(id: LineItemId, estimate: EstimateId) -> Self {
        Self {
            id,
            estimate,
            product: None,
            product_original: None,
            parent: None,
            name: None,
            uom: None,
            order: None,
            quantity: None,
            quantity_formula: None,
            costs: UnitCosts::default(),
            total_cost: None,
            estimate_use_groups: BTreeMap::new(),
            selected_traditional_assembly: false,
            extras: BTreeMap::new(),
            mf: ClassificationCodes::default(),
            uf: ClassificationCodes::default(),
            alternate: None,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Name for messages, falling back to the id
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    /// Classification codes for a scheme
    pub fn codes(&self, scheme: crate::ClassificationScheme) -> &ClassificationCodes {
        match scheme {
            crate::ClassificationScheme::Mf => &self.mf,
            crate::ClassificationScheme::Uf => &self.uf,
        }
    }
}

#[cfg(test)]
#[path = "line_item_test.rs"]
mod tests;
