//! What-if previews over a single branch of line items
//!
//! A preview recomputes quantities, costs and use-group allocation for one
//! root and its descendants without touching the rest of the estimate.
//! Markups are not applied.

use crate::aggregator::check_products;
use crate::allocation::allocate_use_groups;
use crate::arena::LineItemArena;
use crate::assembly::{AssemblyRollup, NodeRollup};
use crate::catalog::ProductIndex;
use crate::error::{AggregationError, AggregationResult};
use crate::quantity::resolve_quantities;
use rollup_core::{
    EstimateSnapshot, EstimateUseGroup, FormulaEvaluator, LineItem, LineItemId, Product,
    RollupConfig, UseGroupKey,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Everything a branch preview needs from outside the branch
#[derive(Debug, Clone)]
pub struct PreviewContext<'a> {
    pub use_groups: &'a [EstimateUseGroup],
    pub products: &'a [Product],
    /// Quantities of line items outside the branch that formulas may read
    pub external_quantities: BTreeMap<LineItemId, f64>,
    pub config: &'a RollupConfig,
}

impl<'a> PreviewContext<'a> {
    pub fn new(
        use_groups: &'a [EstimateUseGroup],
        products: &'a [Product],
        config: &'a RollupConfig,
    ) -> Self {
        Self {
            use_groups,
            products,
            external_quantities: BTreeMap::new(),
            config,
        }
    }

    pub fn with_external_quantities(mut self, quantities: BTreeMap<LineItemId, f64>) -> Self {
        self.external_quantities = quantities;
        self
    }

    /// Context for previewing `branch` inside `snapshot`: use groups and
    /// products from the snapshot, and the resolved quantity of every active
    /// line item outside the branch.
    ///
    /// Outside quantities are resolved over the whole snapshot, so a preview
    /// of an unedited branch agrees with a full aggregation.
    pub fn from_snapshot<E>(
        snapshot: &'a EstimateSnapshot,
        branch: &[LineItem],
        config: &'a RollupConfig,
        evaluator: &E,
    ) -> AggregationResult<Self>
    where
        E: FormulaEvaluator + ?Sized,
    {
        let arena = LineItemArena::build(&snapshot.line_items)?;
        let products = ProductIndex::new(&snapshot.products);
        let quantities = resolve_quantities(&arena, &products, evaluator, &BTreeMap::new())?;

        let inside: HashSet<&str> = branch.iter().map(|item| item.id.as_str()).collect();
        let external = arena
            .iter()
            .filter(|(_, item)| !inside.contains(item.id.as_str()))
            .map(|(k, item)| (item.id.clone(), quantities[k]))
            .collect();
        Ok(Self::new(&snapshot.use_groups, &snapshot.products, config)
            .with_external_quantities(external))
    }
}

/// Preview result for one branch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtreeStats {
    pub root: LineItemId,
    pub subtree_cost: f64,
    pub subtree_quantity: f64,
    pub nodes: BTreeMap<LineItemId, NodeRollup>,
    pub total_by_use_group: BTreeMap<UseGroupKey, f64>,
}

/// `root` and every line item beneath it, in input order
pub fn branch_items(items: &[LineItem], root: &LineItemId) -> AggregationResult<Vec<LineItem>> {
    if !items.iter().any(|item| &item.id == root) {
        return Err(AggregationError::InvalidBranch(format!(
            "line item '{root}' not found"
        )));
    }

    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for item in items {
        if let Some(parent) = &item.parent {
            children
                .entry(parent.as_str())
                .or_default()
                .push(item.id.as_str());
        }
    }

    let mut members: HashSet<&str> = HashSet::from([root.as_str()]);
    let mut queue = VecDeque::from([root.as_str()]);
    while let Some(id) = queue.pop_front() {
        for &child in children.get(id).map(Vec::as_slice).unwrap_or_default() {
            if members.insert(child) {
                queue.push_back(child);
            }
        }
    }

    Ok(items
        .iter()
        .filter(|item| members.contains(item.id.as_str()))
        .cloned()
        .collect())
}

/// Recompute one branch.
///
/// `line_items` must hold exactly one active root (an item whose parent is
/// not in the set) plus its descendants. Alternate branches nested inside it
/// are not part of the root's subtree.
pub fn preview_aggregate<E>(
    line_items: &[LineItem],
    context: &PreviewContext<'_>,
    evaluator: &E,
) -> AggregationResult<SubtreeStats>
where
    E: FormulaEvaluator + ?Sized,
{
    let arena = LineItemArena::build_branch(line_items)?;
    let root = match arena.top_level() {
        [root] => *root,
        [] => {
            return Err(AggregationError::InvalidBranch(
                "branch has no active root".to_string(),
            ))
        }
        roots => {
            return Err(AggregationError::InvalidBranch(format!(
                "branch has {} roots",
                roots.len()
            )))
        }
    };

    let products = ProductIndex::new(context.products);
    check_products(arena.iter().map(|(_, item)| item), &products)?;

    let quantities =
        resolve_quantities(&arena, &products, evaluator, &context.external_quantities)?;
    let rollup = AssemblyRollup::compute(&arena, &quantities);
    let nodes = arena.post_order_from(&[root]);

    let total_by_use_group = allocate_use_groups(
        &arena,
        &rollup,
        &nodes,
        context.use_groups,
        context.config.allocation_tolerance,
    )?;

    let root_rollup = rollup.node(root);
    log::debug!(
        "Previewed branch '{}': {} nodes, subtree cost {}",
        arena.item(root).id,
        nodes.len(),
        root_rollup.subtree_cost
    );
    Ok(SubtreeStats {
        root: arena.item(root).id.clone(),
        subtree_cost: root_rollup.subtree_cost,
        subtree_quantity: root_rollup.subtree_quantity,
        nodes: nodes
            .iter()
            .map(|&k| (arena.item(k).id.clone(), *rollup.node(k)))
            .collect(),
        total_by_use_group,
    })
}

#[cfg(test)]
#[path = "preview_test.rs"]
mod tests;
