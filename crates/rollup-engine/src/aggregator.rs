//! Aggregation orchestrator
//!
//! Sequences arena validation, quantity resolution, cost composition,
//! assembly rollup, use-group allocation, markups and breakdowns over one
//! estimate snapshot. The computation itself is synchronous and pure; only
//! fetching the snapshot goes through the async record store.

use crate::allocation::allocate_use_groups;
use crate::arena::LineItemArena;
use crate::assembly::AssemblyRollup;
use crate::breakdown::{alternate_totals, classification_totals, sort_totals};
use crate::catalog::ProductIndex;
use crate::error::{AggregationError, AggregationResult, ReferenceKind};
use crate::markup::apply_markups;
use crate::preview::{preview_aggregate, PreviewContext, SubtreeStats};
use crate::quantity::resolve_quantities;
use chrono::Utc;
use rollup_core::{
    CoreError, EstimateId, EstimateSnapshot, EstimateStats, EstimateUseGroup, FormulaEvaluator,
    LineItem, RollupConfig, UseGroupKey, UseGroupSummary,
};
use rollup_formula::CachingEvaluator;
use rollup_store::{fetch_snapshot, RecordStore};
use std::collections::BTreeMap;

/// Freshly computed stats, tagged with the estimate's lock state.
///
/// Locked estimates can still be previewed, but only unlocked ones yield
/// stats meant to be written back.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStats {
    stats: EstimateStats,
    locked: bool,
}

impl ComputedStats {
    pub fn preview(&self) -> &EstimateStats {
        &self.stats
    }

    pub fn into_preview(self) -> EstimateStats {
        self.stats
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Stats for persistence; fails for locked estimates
    pub fn into_committable(self) -> AggregationResult<EstimateStats> {
        if self.locked {
            return Err(AggregationError::LockedEstimateWriteRejected(
                self.stats.estimate_id.to_string(),
            ));
        }
        Ok(self.stats)
    }
}

/// Compute stats for one snapshot.
///
/// When `config.cache_formulas` is set the evaluator is wrapped in a
/// [`CachingEvaluator`] that lives for this call only.
pub fn compute_stats<E>(
    snapshot: &EstimateSnapshot,
    evaluator: &E,
    config: &RollupConfig,
) -> AggregationResult<ComputedStats>
where
    E: FormulaEvaluator + ?Sized,
{
    if !config.cache_formulas {
        return run(snapshot, evaluator, config);
    }
    let cached = CachingEvaluator::new(evaluator);
    let result = run(snapshot, &cached, config);
    log::debug!(
        "Formula cache for '{}': {} hits, {} misses",
        snapshot.estimate.id,
        cached.hits(),
        cached.misses()
    );
    result
}

fn run<E>(
    snapshot: &EstimateSnapshot,
    evaluator: &E,
    config: &RollupConfig,
) -> AggregationResult<ComputedStats>
where
    E: FormulaEvaluator + ?Sized,
{
    let estimate = &snapshot.estimate;
    log::debug!(
        "Aggregating estimate '{}' ({} line items, {} markups)",
        estimate.id,
        snapshot.line_items.len(),
        snapshot.markups.len()
    );

    let arena = LineItemArena::build(&snapshot.line_items)?;
    let products = ProductIndex::new(&snapshot.products);
    check_products(arena.iter().map(|(_, item)| item), &products)?;
    for issue in sort_reference_issues(snapshot) {
        log::warn!("{}", issue);
    }

    let quantities = resolve_quantities(&arena, &products, evaluator, &BTreeMap::new())?;
    let rollup = AssemblyRollup::compute(&arena, &quantities);

    let base_roots = arena.base_roots();
    let base_nodes = arena.post_order_from(&base_roots);
    let subtotal = rollup.total_for(&base_roots);

    let allocated = allocate_use_groups(
        &arena,
        &rollup,
        &base_nodes,
        &snapshot.use_groups,
        config.allocation_tolerance,
    )?;
    let markups = apply_markups(
        &snapshot.markups,
        &allocated,
        &snapshot.use_groups,
        evaluator,
        &config.formula_variables,
        config.allocation_tolerance,
    )?;

    let stats = EstimateStats {
        estimate_id: estimate.id.clone(),
        line_item_count: base_nodes.len(),
        subtotal,
        total_cost: markups.total,
        use_groups: use_group_summaries(&snapshot.use_groups, &allocated, &markups.by_use_group),
        total_by_use_group: allocated,
        total_by_markup: markups.contributions,
        total_by_classification: classification_totals(
            &arena,
            &rollup,
            &base_nodes,
            &products,
            config.classification_depth,
        ),
        total_by_sort_field: sort_totals(&arena, &rollup, &base_nodes, &products),
        total_by_alternate: alternate_totals(&arena, &rollup),
        fingerprint: String::new(),
        computed_at: Utc::now(),
    }
    .with_fingerprint();

    log::debug!(
        "Estimate '{}': subtotal {} total {}",
        estimate.id,
        stats.subtotal,
        stats.total_cost
    );
    Ok(ComputedStats {
        stats,
        locked: estimate.lock,
    })
}

/// Every active line item's product must be in the catalog
pub(crate) fn check_products<'a>(
    items: impl IntoIterator<Item = &'a LineItem>,
    products: &ProductIndex<'_>,
) -> AggregationResult<()> {
    for item in items {
        if let Some(product) = &item.product {
            if !products.contains(product) {
                return Err(AggregationError::MissingReference {
                    kind: ReferenceKind::Product,
                    id: product.to_string(),
                    referrer: format!("line item '{}'", item.id),
                });
            }
        }
    }
    Ok(())
}

/// Sort-field references in `extras` that do not match the snapshot's sort
/// taxonomy. These never block aggregation.
pub fn sort_reference_issues(snapshot: &EstimateSnapshot) -> Vec<CoreError> {
    let catalog = snapshot.sort_catalog();
    snapshot
        .line_items
        .iter()
        .filter(|item| !item.is_deleted())
        .filter_map(|item| catalog.validate_extras(item).err())
        .collect()
}

/// One summary row per active use group in display order, then `Unassigned`
pub(crate) fn use_group_summaries(
    use_groups: &[EstimateUseGroup],
    direct: &BTreeMap<UseGroupKey, f64>,
    marked_up: &BTreeMap<UseGroupKey, f64>,
) -> Vec<UseGroupSummary> {
    let mut active: Vec<&EstimateUseGroup> =
        use_groups.iter().filter(|g| g.deleted_at.is_none()).collect();
    active.sort_by(|a, b| a.order.total_cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

    let amount = |map: &BTreeMap<UseGroupKey, f64>, key: &UseGroupKey| {
        map.get(key).copied().unwrap_or(0.0)
    };

    let mut rows: Vec<UseGroupSummary> = active
        .into_iter()
        .map(|group| {
            let key = UseGroupKey::Assigned(group.id.clone());
            UseGroupSummary {
                direct_cost: amount(direct, &key),
                marked_up_cost: amount(marked_up, &key),
                key,
                label: Some(group.label().to_string()),
                order: Some(group.order),
                exclude_area: group.exclude_area,
            }
        })
        .collect();
    rows.push(UseGroupSummary {
        direct_cost: amount(direct, &UseGroupKey::Unassigned),
        marked_up_cost: amount(marked_up, &UseGroupKey::Unassigned),
        key: UseGroupKey::Unassigned,
        label: None,
        order: None,
        exclude_area: false,
    });
    rows
}

/// Runs aggregations against a record store
pub struct Aggregator<S, E> {
    store: S,
    evaluator: E,
    config: RollupConfig,
}

impl<S, E> Aggregator<S, E>
where
    S: RecordStore,
    E: FormulaEvaluator,
{
    pub fn new(store: S, evaluator: E, config: RollupConfig) -> Self {
        Self {
            store,
            evaluator,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RollupConfig {
        &self.config
    }

    /// Fetch an estimate's snapshot and compute its stats
    pub async fn aggregate(&self, id: &EstimateId) -> AggregationResult<ComputedStats> {
        let snapshot = fetch_snapshot(&self.store, id).await?;
        compute_stats(&snapshot, &self.evaluator, &self.config)
    }

    /// Aggregate several estimates concurrently. Results come back in the
    /// order of `ids`; one failure does not affect the others.
    pub async fn aggregate_many(
        &self,
        ids: &[EstimateId],
    ) -> Vec<(EstimateId, AggregationResult<ComputedStats>)> {
        let runs = ids
            .iter()
            .map(|id| async move { (id.clone(), self.aggregate(id).await) });
        futures::future::join_all(runs).await
    }

    /// Preview a branch with this aggregator's evaluator and config
    pub fn preview(
        &self,
        line_items: &[LineItem],
        context: &PreviewContext<'_>,
    ) -> AggregationResult<SubtreeStats> {
        preview_aggregate(line_items, context, &self.evaluator)
    }
}

#[cfg(test)]
#[path = "aggregator_test.rs"]
mod tests;
