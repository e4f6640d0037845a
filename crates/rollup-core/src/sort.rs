//! Sort fields and sort codes
//!
//! A line item's `extras` maps sort field → sort code. Whether the code
//! actually belongs to the field is a write-time invariant; aggregation only
//! groups by the raw ids. [`SortCatalog::validate_extras`] is the check the
//! write path runs.

use crate::error::{CoreError, CoreResult};
use crate::ids::{ProjectId, SortCodeId, SortFieldId};
use crate::line_item::LineItem;
use crate::serde_helpers::{null_as_default, optional_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A custom sort taxonomy (e.g. "Bid Package")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    pub id: SortFieldId,

    pub name: String,

    #[serde(default)]
    pub key: Option<String>,

    /// `None` means application-level, otherwise scoped to a project
    #[serde(default)]
    pub project: Option<ProjectId>,

    /// Shown by default on all projects
    #[serde(default, deserialize_with = "null_as_default")]
    pub standard: bool,

    #[serde(default)]
    pub quantifier_uom: Option<String>,

    #[serde(default, deserialize_with = "optional_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One code within a sort field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortCode {
    pub id: SortCodeId,

    pub code: String,

    #[serde(default)]
    pub description: Option<String>,

    pub sort_field: SortFieldId,

    #[serde(default)]
    pub quantifier: Option<f64>,

    #[serde(default, deserialize_with = "optional_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Index over sort fields and their codes
#[derive(Debug, Clone, Default)]
pub struct SortCatalog {
    fields: BTreeMap<SortFieldId, SortField>,
    codes: BTreeMap<SortCodeId, SortCode>,
}

impl SortCatalog {
    pub fn new(fields: &[SortField], codes: &[SortCode]) -> Self {
        Self {
            fields: fields.iter().map(|f| (f.id.clone(), f.clone())).collect(),
            codes: codes.iter().map(|c| (c.id.clone(), c.clone())).collect(),
        }
    }

    pub fn field(&self, id: &SortFieldId) -> Option<&SortField> {
        self.fields.get(id)
    }

    pub fn code(&self, id: &SortCodeId) -> Option<&SortCode> {
        self.codes.get(id)
    }

    /// Check that every `extras` entry names a known field and a code of that field
    pub fn validate_extras(&self, item: &LineItem) -> CoreResult<()> {
        for (field_id, code_id) in &item.extras {
            if !self.fields.contains_key(field_id) {
                return Err(CoreError::UnknownSortReference {
                    line_item: item.id.to_string(),
                    kind: "sort field",
                    id: field_id.to_string(),
                });
            }
            let code = self
                .codes
                .get(code_id)
                .ok_or_else(|| CoreError::UnknownSortReference {
                    line_item: item.id.to_string(),
                    kind: "sort code",
                    id: code_id.to_string(),
                })?;
            if &code.sort_field != field_id {
                return Err(CoreError::SortCodeFieldMismatch {
                    line_item: item.id.to_string(),
                    sort_field: field_id.to_string(),
                    sort_code: code_id.to_string(),
                    owner: code.sort_field.to_string(),
                });
            }
        }
        Ok(())
    }
}
