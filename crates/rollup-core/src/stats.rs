//! Aggregation output: the estimate `stats` snapshot
//!
//! Every map is a `BTreeMap` so serialized stats are byte-identical across
//! runs on the same input (apart from `computedAt`).

use crate::classification::ClassificationScheme;
use crate::ids::{
    AlternateId, EstimateId, EstimateUseGroupId, MarkupId, SortCodeId, SortFieldId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Bucket for cost with no code at a classification level
pub const UNCLASSIFIED: &str = "unclassified";

/// Key of the unassigned bucket; no use group may take this id
pub const UNASSIGNED: &str = "unassigned";

/// A use-group allocation bucket
///
/// Cost a line item does not allocate to a named use group lands in
/// `Unassigned`, so buckets always sum to the allocated total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UseGroupKey {
    Assigned(EstimateUseGroupId),
    Unassigned,
}

impl UseGroupKey {
    pub fn as_str(&self) -> &str {
        match self {
            UseGroupKey::Assigned(id) => id.as_str(),
            UseGroupKey::Unassigned => UNASSIGNED,
        }
    }
}

impl fmt::Display for UseGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EstimateUseGroupId> for UseGroupKey {
    fn from(id: EstimateUseGroupId) -> Self {
        UseGroupKey::Assigned(id)
    }
}

impl Serialize for UseGroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UseGroupKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == UNASSIGNED {
            return Ok(UseGroupKey::Unassigned);
        }
        EstimateUseGroupId::try_new(s)
            .map(UseGroupKey::Assigned)
            .ok_or_else(|| serde::de::Error::custom("use group key must not be empty"))
    }
}

/// How a markup's amount was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    Percentage,
    Value,
    Formula,
}

/// One markup's effect on the running subtotal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupContribution {
    pub markup_id: MarkupId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub order: f64,

    pub kind: MarkupKind,

    /// The in-scope running subtotal the markup was applied to
    pub base: f64,

    pub amount: f64,

    /// Running subtotal after this markup
    pub running_total: f64,

    /// Share of `amount` attributed to each use-group bucket
    pub by_use_group: BTreeMap<UseGroupKey, f64>,
}

/// Report row for one use-group bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseGroupSummary {
    pub key: UseGroupKey,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,

    pub exclude_area: bool,

    /// Allocated cost before markups
    pub direct_cost: f64,

    /// Allocated cost including markup shares
    pub marked_up_cost: f64,
}

/// Own-cost totals per scheme → level → code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationTotals {
    #[serde(default)]
    pub mf: BTreeMap<u8, BTreeMap<String, f64>>,

    #[serde(default)]
    pub uf: BTreeMap<u8, BTreeMap<String, f64>>,
}

impl ClassificationTotals {
    pub fn scheme(&self, scheme: ClassificationScheme) -> &BTreeMap<u8, BTreeMap<String, f64>> {
        match scheme {
            ClassificationScheme::Mf => &self.mf,
            ClassificationScheme::Uf => &self.uf,
        }
    }

    pub fn add(&mut self, scheme: ClassificationScheme, level: u8, code: &str, amount: f64) {
        let levels = match scheme {
            ClassificationScheme::Mf => &mut self.mf,
            ClassificationScheme::Uf => &mut self.uf,
        };
        *levels
            .entry(level)
            .or_default()
            .entry(code.to_string())
            .or_insert(0.0) += amount;
    }

    /// Total for one code, if recorded
    pub fn get(&self, scheme: ClassificationScheme, level: u8, code: &str) -> Option<f64> {
        self.scheme(scheme).get(&level)?.get(code).copied()
    }
}

/// The derived, cached summary of one estimate. Always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateStats {
    pub estimate_id: EstimateId,

    /// Line items that contributed to the base total
    pub line_item_count: usize,

    /// Direct cost before markups
    pub subtotal: f64,

    /// Final total after the last markup
    pub total_cost: f64,

    /// Direct cost per use-group bucket; sums to `subtotal`
    pub total_by_use_group: BTreeMap<UseGroupKey, f64>,

    pub use_groups: Vec<UseGroupSummary>,

    /// Markups in application order
    pub total_by_markup: Vec<MarkupContribution>,

    pub total_by_classification: ClassificationTotals,

    pub total_by_sort_field: BTreeMap<SortFieldId, BTreeMap<SortCodeId, f64>>,

    /// Subtree cost of alternate branches, excluded from `subtotal`
    pub total_by_alternate: BTreeMap<AlternateId, f64>,

    /// SHA-256 over every field except `computedAt` and this one
    pub fingerprint: String,

    pub computed_at: DateTime<Utc>,
}

impl EstimateStats {
    /// Recompute the content fingerprint.
    pub fn compute_fingerprint(&self) -> String {
        let content = serde_json::to_string(&(
            &self.estimate_id,
            self.line_item_count,
            self.subtotal,
            self.total_cost,
            &self.total_by_use_group,
            &self.use_groups,
            &self.total_by_markup,
            &self.total_by_classification,
            &self.total_by_sort_field,
            &self.total_by_alternate,
        ))
        .unwrap_or_default();
        format!("{:x}", Sha256::digest(content.as_bytes()))
    }

    /// Stamp the fingerprint field from current content
    pub fn with_fingerprint(mut self) -> Self {
        self.fingerprint = self.compute_fingerprint();
        self
    }

    /// Markup amount for one markup
    pub fn markup_amount(&self, id: &MarkupId) -> Option<f64> {
        self.total_by_markup
            .iter()
            .find(|m| &m.markup_id == id)
            .map(|m| m.amount)
    }
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod tests;
