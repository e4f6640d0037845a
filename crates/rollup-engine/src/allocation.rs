//! Use-group allocation
//!
//! Each line item splits its own cost across the estimate's use groups by
//! percentage. Whatever it leaves unallocated goes to the `Unassigned`
//! bucket, so the buckets always sum to the cost that was allocated.

use crate::arena::LineItemArena;
use crate::assembly::AssemblyRollup;
use crate::error::{AggregationError, AggregationResult, ReferenceKind};
use rollup_core::{EstimateUseGroup, UseGroupKey, UNASSIGNED};
use std::collections::{BTreeMap, HashSet};

/// Allocate the own cost of every item in `nodes` to use-group buckets.
///
/// Every active use group appears in the result, even at zero. Percentages
/// pointing at a soft-deleted use group fall through to `Unassigned`.
pub fn allocate_use_groups(
    arena: &LineItemArena<'_>,
    rollup: &AssemblyRollup,
    nodes: &[usize],
    use_groups: &[EstimateUseGroup],
    tolerance: f64,
) -> AggregationResult<BTreeMap<UseGroupKey, f64>> {
    if let Some(group) = use_groups.iter().find(|g| g.id == UNASSIGNED) {
        return Err(AggregationError::ReservedUseGroupId(group.id.clone()));
    }

    let active: HashSet<&str> = use_groups
        .iter()
        .filter(|g| g.deleted_at.is_none())
        .map(|g| g.id.as_str())
        .collect();
    let deleted: HashSet<&str> = use_groups
        .iter()
        .filter(|g| g.deleted_at.is_some())
        .map(|g| g.id.as_str())
        .collect();

    let mut totals: BTreeMap<UseGroupKey, f64> = use_groups
        .iter()
        .filter(|g| g.deleted_at.is_none())
        .map(|g| (UseGroupKey::Assigned(g.id.clone()), 0.0))
        .collect();
    totals.insert(UseGroupKey::Unassigned, 0.0);

    for &k in nodes {
        let item = arena.item(k);
        let own_cost = rollup.node(k).own_cost;

        let mut percent_total = 0.0;
        for (group, &percentage) in &item.estimate_use_groups {
            if !percentage.is_finite() || percentage < 0.0 {
                return Err(AggregationError::InvalidUseGroupPercentage {
                    line_item: item.id.clone(),
                    use_group: group.clone(),
                    percentage,
                });
            }
            if !active.contains(group.as_str()) && !deleted.contains(group.as_str()) {
                return Err(AggregationError::MissingReference {
                    kind: ReferenceKind::UseGroup,
                    id: group.to_string(),
                    referrer: format!("line item '{}'", item.id),
                });
            }
            percent_total += percentage;
        }
        if percent_total > 100.0 + tolerance {
            return Err(AggregationError::OverallocatedUseGroup {
                line_item: item.id.clone(),
                total: percent_total,
            });
        }

        let mut assigned = 0.0;
        for (group, &percentage) in &item.estimate_use_groups {
            if !active.contains(group.as_str()) {
                log::warn!(
                    "Line item '{}' allocates {}% to deleted use group '{}'; leaving it unassigned",
                    item.id,
                    percentage,
                    group
                );
                continue;
            }
            let share = own_cost * percentage / 100.0;
            *totals
                .entry(UseGroupKey::Assigned(group.clone()))
                .or_insert(0.0) += share;
            assigned += share;
        }
        *totals.entry(UseGroupKey::Unassigned).or_insert(0.0) += own_cost - assigned;
    }

    Ok(totals)
}
