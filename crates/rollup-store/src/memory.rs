//! In-memory record store loaded from exported record tables

use crate::error::{StoreError, StoreResult};
use crate::traits::RecordStore;
use async_trait::async_trait;
use rollup_core::{
    Estimate, EstimateId, EstimateMarkup, EstimateSnapshot, EstimateUseGroup, LineItem, Product,
    ProductId, ProjectId, SortCode, SortField, SortFieldId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Record tables as exported, one array per table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordTables {
    #[serde(default)]
    pub estimates: Vec<Estimate>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub estimate_markups: Vec<EstimateMarkup>,
    #[serde(default)]
    pub estimate_use_groups: Vec<EstimateUseGroup>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub sort_fields: Vec<SortField>,
    #[serde(default)]
    pub sort_codes: Vec<SortCode>,
}

impl RecordTables {
    /// Parse tables from JSON, or YAML when `yaml` is set
    pub fn parse(content: &str, yaml: bool, path: &str) -> StoreResult<Self> {
        let parsed = if yaml {
            serde_yaml::from_str(content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| StoreError::Parse {
            path: path.to_string(),
            message,
        })
    }

    /// Tables holding exactly one snapshot's records
    pub fn from_snapshot(snapshot: EstimateSnapshot) -> Self {
        Self {
            estimates: vec![snapshot.estimate],
            line_items: snapshot.line_items,
            estimate_markups: snapshot.markups,
            estimate_use_groups: snapshot.use_groups,
            products: snapshot.products,
            sort_fields: snapshot.sort_fields,
            sort_codes: snapshot.sort_codes,
        }
    }
}

/// Record store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    estimates: BTreeMap<EstimateId, Estimate>,
    line_items: BTreeMap<EstimateId, Vec<LineItem>>,
    markups: BTreeMap<EstimateId, Vec<EstimateMarkup>>,
    use_groups: BTreeMap<EstimateId, Vec<EstimateUseGroup>>,
    products: BTreeMap<ProductId, Product>,
    sort_fields: Vec<SortField>,
    sort_codes: Vec<SortCode>,
}

fn check_unique<'a, I>(table: &'static str, ids: I) -> StoreResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(StoreError::DuplicateRecord {
                table,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index record tables, rejecting duplicate ids
    pub fn from_tables(tables: RecordTables) -> StoreResult<Self> {
        check_unique("estimate", tables.estimates.iter().map(|e| e.id.as_str()))?;
        check_unique("product", tables.products.iter().map(|p| p.id.as_str()))?;
        check_unique(
            "estimate_markup",
            tables.estimate_markups.iter().map(|m| m.id.as_str()),
        )?;
        check_unique(
            "estimate_use_group",
            tables.estimate_use_groups.iter().map(|u| u.id.as_str()),
        )?;

        let mut store = Self::new();
        for estimate in tables.estimates {
            store.estimates.insert(estimate.id.clone(), estimate);
        }
        for item in tables.line_items {
            store
                .line_items
                .entry(item.estimate.clone())
                .or_default()
                .push(item);
        }
        for markup in tables.estimate_markups {
            store
                .markups
                .entry(markup.estimate.clone())
                .or_default()
                .push(markup);
        }
        for group in tables.estimate_use_groups {
            store
                .use_groups
                .entry(group.estimate.clone())
                .or_default()
                .push(group);
        }
        for product in tables.products {
            store.products.insert(product.id.clone(), product);
        }
        store.sort_fields = tables.sort_fields;
        store.sort_codes = tables.sort_codes;
        Ok(store)
    }

    /// Load tables from a `.json`, `.yml` or `.yaml` file
    pub async fn load(path: &Path) -> StoreResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );
        let tables = RecordTables::parse(&content, yaml, &path.display().to_string())?;
        Self::from_tables(tables)
    }

    /// Ids of every estimate that is not soft-deleted
    pub fn estimate_ids(&self) -> Vec<EstimateId> {
        self.estimates
            .values()
            .filter(|e| e.deleted_at.is_none())
            .map(|e| e.id.clone())
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn estimate(&self, id: &EstimateId) -> StoreResult<Option<Estimate>> {
        Ok(self
            .estimates
            .get(id)
            .filter(|e| e.deleted_at.is_none())
            .cloned())
    }

    async fn line_items(&self, estimate: &EstimateId) -> StoreResult<Vec<LineItem>> {
        Ok(self.line_items.get(estimate).cloned().unwrap_or_default())
    }

    async fn markups(&self, estimate: &EstimateId) -> StoreResult<Vec<EstimateMarkup>> {
        Ok(self.markups.get(estimate).cloned().unwrap_or_default())
    }

    async fn use_groups(&self, estimate: &EstimateId) -> StoreResult<Vec<EstimateUseGroup>> {
        Ok(self.use_groups.get(estimate).cloned().unwrap_or_default())
    }

    async fn products(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.products.get(id))
            .cloned()
            .collect())
    }

    async fn sort_fields(&self, project: &ProjectId) -> StoreResult<Vec<SortField>> {
        Ok(self
            .sort_fields
            .iter()
            .filter(|f| f.deleted_at.is_none())
            .filter(|f| f.project.as_ref().map_or(true, |p| p == project))
            .cloned()
            .collect())
    }

    async fn sort_codes(&self, fields: &[SortFieldId]) -> StoreResult<Vec<SortCode>> {
        Ok(self
            .sort_codes
            .iter()
            .filter(|c| c.deleted_at.is_none() && fields.contains(&c.sort_field))
            .cloned()
            .collect())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
