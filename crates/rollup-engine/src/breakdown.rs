//! Cost breakdowns by classification code, sort code, and alternate
//!
//! All breakdowns use each line item's own cost, so every level of a
//! breakdown sums to the same pre-markup subtotal.

use crate::arena::LineItemArena;
use crate::assembly::AssemblyRollup;
use crate::catalog::ProductIndex;
use rollup_core::{
    AlternateId, ClassificationCodes, ClassificationDepth, ClassificationLookup,
    ClassificationScheme, ClassificationTotals, LineItem, SortCodeId, SortFieldId, UNCLASSIFIED,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A line item's codes, or its product's when it carries none
fn effective_codes<'a>(
    item: &'a LineItem,
    products: &ProductIndex<'a>,
    scheme: ClassificationScheme,
) -> &'a ClassificationCodes {
    let own = item.codes(scheme);
    if !own.is_empty() {
        return own;
    }
    item.product
        .as_ref()
        .and_then(|id| products.get(id))
        .map_or(own, |product| product.codes(scheme))
}

/// Own cost per scheme, level and code.
///
/// With [`ClassificationDepth::All`], every level that appears anywhere in the
/// estimate gets an entry per item (missing codes go to `unclassified`). With
/// [`ClassificationDepth::Deepest`], each item counts once, at its deepest
/// level; uncoded items land in level 1 `unclassified`. Either way a scheme
/// that no item carries a code in is left out.
pub fn classification_totals(
    arena: &LineItemArena<'_>,
    rollup: &AssemblyRollup,
    nodes: &[usize],
    products: &ProductIndex<'_>,
    depth: ClassificationDepth,
) -> ClassificationTotals {
    let mut totals = ClassificationTotals::default();

    for scheme in ClassificationScheme::ALL {
        let codes: Vec<(f64, &ClassificationCodes)> = nodes
            .iter()
            .map(|&k| {
                (
                    rollup.node(k).own_cost,
                    effective_codes(arena.item(k), products, scheme),
                )
            })
            .collect();
        if codes.iter().all(|(_, c)| c.is_empty()) {
            continue;
        }

        match depth {
            ClassificationDepth::All => {
                let levels: BTreeSet<u8> = codes
                    .iter()
                    .flat_map(|(_, c)| c.iter().map(|(level, _)| level))
                    .collect();
                for level in levels {
                    for (cost, c) in &codes {
                        let code = c.get(level).unwrap_or(UNCLASSIFIED);
                        totals.add(scheme, level, code, *cost);
                    }
                }
            }
            ClassificationDepth::Deepest => {
                for (cost, c) in &codes {
                    let (level, code) = c.deepest().unwrap_or((1, UNCLASSIFIED));
                    totals.add(scheme, level, code, *cost);
                }
            }
        }
    }

    totals
}

/// Own cost per sort field and sort code, from `extras` (falling back to the
/// product's `extras`)
pub fn sort_totals(
    arena: &LineItemArena<'_>,
    rollup: &AssemblyRollup,
    nodes: &[usize],
    products: &ProductIndex<'_>,
) -> BTreeMap<SortFieldId, BTreeMap<SortCodeId, f64>> {
    let mut totals: BTreeMap<SortFieldId, BTreeMap<SortCodeId, f64>> = BTreeMap::new();
    for &k in nodes {
        let item = arena.item(k);
        let extras = if item.extras.is_empty() {
            item.product
                .as_ref()
                .and_then(|id| products.get(id))
                .map_or(&item.extras, |p| &p.extras)
        } else {
            &item.extras
        };
        for (field, code) in extras {
            *totals
                .entry(field.clone())
                .or_default()
                .entry(code.clone())
                .or_insert(0.0) += rollup.node(k).own_cost;
        }
    }
    totals
}

/// Subtree cost of each alternate branch
pub fn alternate_totals(
    arena: &LineItemArena<'_>,
    rollup: &AssemblyRollup,
) -> BTreeMap<AlternateId, f64> {
    let mut totals = BTreeMap::new();
    for k in arena.alternate_roots() {
        if let Some(alternate) = &arena.item(k).alternate {
            *totals.entry(alternate.clone()).or_insert(0.0) += rollup.node(k).subtree_cost;
        }
    }
    totals
}

/// One line of the classification report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRow {
    pub scheme: ClassificationScheme,
    pub level: u8,
    pub code: String,
    pub description: Option<String>,
    pub cost: f64,
}

/// Join classification totals with descriptions, scheme then level then code
pub fn describe_classification(
    totals: &ClassificationTotals,
    lookup: &dyn ClassificationLookup,
) -> Vec<ClassificationRow> {
    let mut rows = Vec::new();
    for scheme in ClassificationScheme::ALL {
        for (level, codes) in totals.scheme(scheme) {
            for (code, cost) in codes {
                let description = if code == UNCLASSIFIED {
                    None
                } else {
                    lookup.describe(scheme, code)
                };
                rows.push(ClassificationRow {
                    scheme,
                    level: *level,
                    code: code.clone(),
                    description,
                    cost: *cost,
                });
            }
        }
    }
    rows
}

#[cfg(test)]
#[path = "breakdown_test.rs"]
mod tests;
