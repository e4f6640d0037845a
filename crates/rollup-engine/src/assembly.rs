//! Assembly rollup: fold each subtree's cost and quantity into its root

use crate::arena::LineItemArena;
use crate::cost::compose_cost;
use rollup_core::LineItemId;
use serde::Serialize;

/// Rolled-up figures for one line item
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRollup {
    pub unit_cost: f64,
    pub own_quantity: f64,
    pub own_cost: f64,
    /// Own cost plus every attached descendant's own cost
    pub subtree_cost: f64,
    /// Own quantity for leaves and STA assemblies, else the children's sum
    pub subtree_quantity: f64,
}

#[derive(Debug, Clone)]
pub struct AssemblyRollup {
    nodes: Vec<NodeRollup>,
}

impl AssemblyRollup {
    /// Roll up every item in the arena. `quantities` is indexed by arena
    /// position.
    pub fn compute(arena: &LineItemArena<'_>, quantities: &[f64]) -> Self {
        let mut nodes = vec![NodeRollup::default(); arena.len()];
        for k in arena.post_order() {
            let item = arena.item(k);
            let cost = compose_cost(item, quantities[k]);
            let children = arena.children(k);

            let subtree_cost =
                cost.total_cost + children.iter().map(|&c| nodes[c].subtree_cost).sum::<f64>();
            let subtree_quantity = if children.is_empty() || item.selected_traditional_assembly {
                quantities[k]
            } else {
                children.iter().map(|&c| nodes[c].subtree_quantity).sum()
            };

            nodes[k] = NodeRollup {
                unit_cost: cost.unit_cost,
                own_quantity: quantities[k],
                own_cost: cost.total_cost,
                subtree_cost,
                subtree_quantity,
            };
        }
        Self { nodes }
    }

    pub fn node(&self, k: usize) -> &NodeRollup {
        &self.nodes[k]
    }

    pub fn get(&self, arena: &LineItemArena<'_>, id: &LineItemId) -> Option<&NodeRollup> {
        arena.index_of(id).map(|k| &self.nodes[k])
    }

    /// Sum of subtree costs over a set of roots
    pub fn total_for(&self, roots: &[usize]) -> f64 {
        roots.iter().map(|&k| self.nodes[k].subtree_cost).sum()
    }
}
