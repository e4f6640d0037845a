//! Estimate, markup, and estimate use-group records

use crate::ids::{AlternateId, EstimateId, EstimateUseGroupId, MarkupId, ProjectId, UseGroupId};
use crate::serde_helpers::{null_as_default, optional_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// An estimate header.
///
/// The cached `stats` column of an export is deliberately not modelled: it is
/// derived data, regenerated by every aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub id: EstimateId,

    #[serde(default)]
    pub name: Option<String>,

    pub project: ProjectId,

    #[serde(default)]
    pub phase: Option<String>,

    /// Lineage when duplicated from another estimate
    #[serde(default)]
    pub original_estimate: Option<EstimateId>,

    /// Locked estimates may be computed but results must not be written back
    #[serde(default, deserialize_with = "null_as_default")]
    pub lock: bool,

    /// At most one active estimate per project; enforced by the caller
    #[serde(default, deserialize_with = "null_as_default")]
    pub active: bool,

    #[serde(default, deserialize_with = "optional_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Estimate {
    pub fn new(id: EstimateId, project: ProjectId) -> Self {
        Self {
            id,
            name: None,
            project,
            phase: None,
            original_estimate: None,
            lock: false,
            active: false,
            deleted_at: None,
        }
    }
}

/// Where a markup's amount comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkupSource<'a> {
    /// Percent of the running subtotal
    Percentage(f64),
    /// Flat amount
    Value(f64),
    /// Expression evaluated by the formula collaborator
    Formula(&'a str),
}

/// A fee or adjustment layered on top of line-item costs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateMarkup {
    pub id: MarkupId,

    pub estimate: EstimateId,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub percentage: Option<f64>,

    #[serde(default)]
    pub value: Option<f64>,

    #[serde(default)]
    pub formula: Option<String>,

    /// Application sequence, ascending
    pub order: f64,

    #[serde(default)]
    pub alternate: Option<AlternateId>,

    /// Restricts the markup to these use groups; the value is an optional
    /// weight in percent. Empty means the markup applies to everything.
    #[serde(default, deserialize_with = "null_as_default")]
    pub estimate_use_groups: BTreeMap<EstimateUseGroupId, Option<f64>>,

    #[serde(default, deserialize_with = "optional_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EstimateMarkup {
    pub fn new(id: MarkupId, estimate: EstimateId, order: f64) -> Self {
        Self {
            id,
            estimate,
            description: None,
            percentage: None,
            value: None,
            formula: None,
            order,
            alternate: None,
            estimate_use_groups: BTreeMap::new(),
            deleted_at: None,
        }
    }

    /// The effective amount source: first non-null of percentage, value, formula
    pub fn source(&self) -> Option<MarkupSource<'_>> {
        if let Some(pct) = self.percentage {
            Some(MarkupSource::Percentage(pct))
        } else if let Some(value) = self.value {
            Some(MarkupSource::Value(value))
        } else {
            self.formula
                .as_deref()
                .filter(|f| !f.trim().is_empty())
                .map(MarkupSource::Formula)
        }
    }

    /// Application order: ascending `order`, ties broken by id
    pub fn application_order(&self, other: &Self) -> Ordering {
        self.order
            .total_cmp(&other.order)
            .then_with(|| self.id.cmp(&other.id))
    }

    pub fn is_restricted(&self) -> bool {
        !self.estimate_use_groups.is_empty()
    }

    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(self.id.as_str())
    }
}

/// A use group as configured on one estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateUseGroup {
    pub id: EstimateUseGroupId,

    pub estimate: EstimateId,

    /// Application-level use group this one is connected to
    pub use_group: UseGroupId,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub order: f64,

    /// Excluded from project gross-area rollups; no effect on cost
    #[serde(default, deserialize_with = "null_as_default")]
    pub exclude_area: bool,

    #[serde(default, deserialize_with = "optional_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EstimateUseGroup {
    pub fn new(id: EstimateUseGroupId, estimate: EstimateId, use_group: UseGroupId) -> Self {
        Self {
            id,
            estimate,
            use_group,
            label: None,
            order: 0.0,
            exclude_area: false,
            deleted_at: None,
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.id.as_str())
    }
}

#[cfg(test)]
#[path = "estimate_test.rs"]
mod tests;
