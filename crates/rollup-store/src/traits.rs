//! Record store trait definition

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use rollup_core::{
    Estimate, EstimateId, EstimateMarkup, EstimateSnapshot, EstimateUseGroup, LineItem, Product,
    ProductId, ProjectId, SortCode, SortField, SortFieldId,
};
use std::collections::BTreeSet;

/// Read-only access to estimate records.
///
/// The engine never writes through this trait; persisting `stats` is the
/// caller's job. Implementations must be Send + Sync so several estimates
/// can be fetched concurrently.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch an estimate header
    async fn estimate(&self, id: &EstimateId) -> StoreResult<Option<Estimate>>;

    /// All line items of an estimate, deleted ones included
    async fn line_items(&self, estimate: &EstimateId) -> StoreResult<Vec<LineItem>>;

    /// All markups of an estimate
    async fn markups(&self, estimate: &EstimateId) -> StoreResult<Vec<EstimateMarkup>>;

    /// All use groups configured on an estimate
    async fn use_groups(&self, estimate: &EstimateId) -> StoreResult<Vec<EstimateUseGroup>>;

    /// Products by id; unknown ids are skipped
    async fn products(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>>;

    /// Application-level sort fields plus those scoped to `project`
    async fn sort_fields(&self, project: &ProjectId) -> StoreResult<Vec<SortField>>;

    /// Codes belonging to the given sort fields
    async fn sort_codes(&self, fields: &[SortFieldId]) -> StoreResult<Vec<SortCode>>;

    /// Store type identifier for logging
    fn store_type(&self) -> &'static str;
}

/// Fetch everything one aggregation run needs, before the run starts.
pub async fn fetch_snapshot<S: RecordStore + ?Sized>(
    store: &S,
    id: &EstimateId,
) -> StoreResult<EstimateSnapshot> {
    let estimate = store
        .estimate(id)
        .await?
        .ok_or_else(|| StoreError::EstimateNotFound(id.to_string()))?;

    let line_items = store.line_items(id).await?;
    let markups = store.markups(id).await?;
    let use_groups = store.use_groups(id).await?;

    let product_ids: Vec<ProductId> = line_items
        .iter()
        .filter_map(|li| li.product.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let products = store.products(&product_ids).await?;

    let sort_fields = store.sort_fields(&estimate.project).await?;
    let field_ids: Vec<SortFieldId> = sort_fields.iter().map(|f| f.id.clone()).collect();
    let sort_codes = store.sort_codes(&field_ids).await?;

    log::debug!(
        "Fetched estimate {} from {} store: {} line items, {} markups, {} use groups, {} products",
        id,
        store.store_type(),
        line_items.len(),
        markups.len(),
        use_groups.len(),
        products.len()
    );

    Ok(EstimateSnapshot {
        estimate,
        line_items,
        markups,
        use_groups,
        products,
        sort_fields,
        sort_codes,
    })
}
