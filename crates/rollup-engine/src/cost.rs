//! Unit cost and line total composition

use rollup_core::{LineItem, UnitCosts};

const STALE_TOTAL_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposedCost {
    pub unit_cost: f64,
    pub total_cost: f64,
}

/// A stored `total_uc` wins; otherwise the component unit costs are summed,
/// with absent components counting as zero.
pub fn effective_unit_cost(costs: &UnitCosts) -> f64 {
    costs
        .total_uc
        .unwrap_or_else(|| costs.components().iter().flatten().sum())
}

/// Cost of a line item at an already-resolved quantity.
///
/// The stored `total_cost` is treated as a cache and never read for the
/// result. Negative values (credits) pass through unchanged.
pub fn compose_cost(item: &LineItem, quantity: f64) -> ComposedCost {
    let unit_cost = effective_unit_cost(&item.costs);
    let total_cost = quantity * unit_cost;
    if let Some(stored) = stale_total(item, total_cost) {
        log::warn!(
            "Line item '{}' stored total {} differs from computed {}",
            item.id,
            stored,
            total_cost
        );
    }
    ComposedCost {
        unit_cost,
        total_cost,
    }
}

/// The stored `total_cost`, when it disagrees with `computed`
fn stale_total(item: &LineItem, computed: f64) -> Option<f64> {
    item.total_cost
        .filter(|stored| (stored - computed).abs() > STALE_TOTAL_EPSILON)
}
