//! Universal Product Catalog entries

use crate::classification::{ClassificationCodes, ClassificationScheme};
use crate::formula::QuantityFormula;
use crate::ids::{ProductId, SortCodeId, SortFieldId};
use crate::serde_helpers::{empty_object_as_none, null_as_default, optional_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-product behaviour flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    #[serde(default)]
    pub add_for_estimate_use_groups: bool,
}

/// A catalog product. Shared across estimates, never owned by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub uom: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub item_code: Option<String>,

    /// Default quantity expression for line items created from this product
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub quantity_formula: Option<QuantityFormula>,

    /// Assembly children: child product → quantity per unit of this product
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: BTreeMap<ProductId, f64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub config: ProductConfig,

    #[serde(default, deserialize_with = "null_as_default")]
    pub extras: BTreeMap<SortFieldId, SortCodeId>,

    #[serde(default)]
    pub mf: ClassificationCodes,

    #[serde(default)]
    pub uf: ClassificationCodes,

    #[serde(default, deserialize_with = "optional_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(id: ProductId) -> Self {
        Self {
            id,
            name: None,
            uom: None,
            category: None,
            item_code: None,
            quantity_formula: None,
            children: BTreeMap::new(),
            config: ProductConfig::default(),
            extras: BTreeMap::new(),
            mf: ClassificationCodes::default(),
            uf: ClassificationCodes::default(),
            deleted_at: None,
        }
    }

    pub fn is_assembly(&self) -> bool {
        !self.children.is_empty()
    }

    /// Quantity of `child` per unit of this product, if it is a listed child
    pub fn child_ratio(&self, child: &ProductId) -> Option<f64> {
        self.children.get(child).copied()
    }

    pub fn codes(&self, scheme: ClassificationScheme) -> &ClassificationCodes {
        match scheme {
            ClassificationScheme::Mf => &self.mf,
            ClassificationScheme::Uf => &self.uf,
        }
    }
}
