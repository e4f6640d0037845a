//! Quantity resolution
//!
//! Every active line item gets exactly one quantity source. Sources that read
//! other quantities (formulas, child sums, assembly ratios) become edges in a
//! dependency graph, which is topologically sorted so each quantity is
//! computed after everything it reads. A cycle anywhere aborts the run.

use crate::arena::LineItemArena;
use crate::catalog::ProductIndex;
use crate::error::{AggregationError, AggregationResult};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use rollup_core::{FormulaEvaluator, LineItemId, QuantityFormula};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Where a line item's quantity comes from
#[derive(Debug)]
enum QuantitySource<'a> {
    /// Non-STA assembly: the sum of its children
    ChildSum,
    Literal(f64),
    Formula {
        formula: &'a QuantityFormula,
        entity: String,
    },
    /// Child of an STA assembly whose product fixes a per-unit ratio
    Ratio { parent: usize, ratio: f64 },
}

/// Resolve the effective quantity of every item in the arena.
///
/// The result is indexed by arena position. `external` supplies quantities of
/// line items outside the arena that formulas may still reference (used when
/// previewing a single branch).
pub fn resolve_quantities<E>(
    arena: &LineItemArena<'_>,
    products: &ProductIndex<'_>,
    evaluator: &E,
    external: &BTreeMap<LineItemId, f64>,
) -> AggregationResult<Vec<f64>>
where
    E: FormulaEvaluator + ?Sized,
{
    let sources = (0..arena.len())
        .map(|k| quantity_source(arena, products, k))
        .collect::<AggregationResult<Vec<_>>>()?;

    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(arena.len(), arena.len());
    let nodes: Vec<NodeIndex> = (0..arena.len()).map(|k| graph.add_node(k)).collect();

    // Edges run from dependency to dependent so toposort yields inputs first
    for (k, source) in sources.iter().enumerate() {
        match source {
            QuantitySource::ChildSum => {
                for &child in arena.children(k) {
                    graph.add_edge(nodes[child], nodes[k], ());
                }
            }
            QuantitySource::Formula { formula, .. } => {
                for (name, target) in &formula.variables {
                    match arena.index_of(target) {
                        Some(t) => {
                            graph.add_edge(nodes[t], nodes[k], ());
                        }
                        None if external.contains_key(target) => {}
                        None => return Err(unresolved_variable(arena, k, name, target)),
                    }
                }
            }
            QuantitySource::Ratio { parent, .. } => {
                graph.add_edge(nodes[*parent], nodes[k], ());
            }
            QuantitySource::Literal(_) => {}
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| AggregationError::CyclicFormula {
        cycle: cycle_path(&graph, cycle.node_id())
            .into_iter()
            .map(|node| arena.item(graph[node]).id.clone())
            .collect(),
    })?;

    let mut values = vec![0.0; arena.len()];
    for node in order {
        let k = graph[node];
        values[k] = match &sources[k] {
            QuantitySource::Literal(q) => *q,
            QuantitySource::ChildSum => arena.children(k).iter().map(|&c| values[c]).sum(),
            QuantitySource::Ratio { parent, ratio } => values[*parent] * ratio,
            QuantitySource::Formula { formula, entity } => {
                let mut variables = BTreeMap::new();
                for (name, target) in &formula.variables {
                    let value = match arena.index_of(target) {
                        Some(t) => Some(values[t]),
                        None => external.get(target).copied(),
                    };
                    let value = value.ok_or_else(|| unresolved_variable(arena, k, name, target))?;
                    variables.insert(name.clone(), value);
                }
                evaluator
                    .evaluate(&formula.expression, &variables)
                    .map_err(|source| AggregationError::Formula {
                        entity: entity.clone(),
                        source,
                    })?
            }
        };
    }

    log::debug!("Resolved {} line item quantities", values.len());
    Ok(values)
}

fn quantity_source<'a>(
    arena: &LineItemArena<'a>,
    products: &ProductIndex<'a>,
    k: usize,
) -> AggregationResult<QuantitySource<'a>> {
    let item = arena.item(k);

    if !arena.is_leaf(k) && !item.selected_traditional_assembly {
        if item.quantity.is_some() {
            log::debug!(
                "Ignoring stored quantity of assembly '{}'; using child sum",
                item.id
            );
        }
        return Ok(QuantitySource::ChildSum);
    }

    if let Some(quantity) = item.quantity {
        if non_blank(item.quantity_formula.as_ref()).is_some() {
            log::warn!(
                "Line item '{}' stores quantity {} next to a formula; using the quantity",
                item.id,
                quantity
            );
        }
        return Ok(QuantitySource::Literal(quantity));
    }

    if let Some(formula) = non_blank(item.quantity_formula.as_ref()) {
        return Ok(QuantitySource::Formula {
            formula,
            entity: format!("quantity formula of line item '{}'", item.id),
        });
    }

    let product = item.product.as_ref().and_then(|id| products.get(id));
    if let Some(formula) = non_blank(product.and_then(|p| p.quantity_formula.as_ref())) {
        return Ok(QuantitySource::Formula {
            formula,
            entity: format!(
                "default quantity formula of product '{}' (line item '{}')",
                product.map(|p| p.id.as_str()).unwrap_or_default(),
                item.id
            ),
        });
    }

    if let (Some(parent), Some(child_product)) = (arena.parent(k), item.product.as_ref()) {
        let parent_item = arena.item(parent);
        if parent_item.selected_traditional_assembly {
            let ratio = parent_item
                .product
                .as_ref()
                .and_then(|id| products.get(id))
                .and_then(|p| p.child_ratio(child_product));
            if let Some(ratio) = ratio {
                return Ok(QuantitySource::Ratio { parent, ratio });
            }
        }
    }

    Err(AggregationError::UnresolvedReference {
        line_item: item.id.clone(),
        reason: "no quantity, formula, product default, or assembly ratio".to_string(),
    })
}

fn non_blank(formula: Option<&QuantityFormula>) -> Option<&QuantityFormula> {
    formula.filter(|f| !f.expression.trim().is_empty())
}

fn unresolved_variable(
    arena: &LineItemArena<'_>,
    k: usize,
    name: &str,
    target: &LineItemId,
) -> AggregationError {
    let state = if arena.is_excluded(target) {
        "deleted"
    } else {
        "unknown"
    };
    AggregationError::UnresolvedReference {
        line_item: arena.item(k).id.clone(),
        reason: format!("formula variable '{name}' refers to {state} line item '{target}'"),
    }
}

/// Shortest cycle through `start`, in dependency order
fn cycle_path(graph: &DiGraph<usize, ()>, start: NodeIndex) -> Vec<NodeIndex> {
    let members: HashSet<NodeIndex> = tarjan_scc(graph)
        .into_iter()
        .find(|component| component.contains(&start))
        .unwrap_or_else(|| vec![start])
        .into_iter()
        .collect();

    let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    let mut closing = None;
    'search: while let Some(node) = queue.pop_front() {
        for next in graph.neighbors(node) {
            if !members.contains(&next) {
                continue;
            }
            if next == start {
                closing = Some(node);
                break 'search;
            }
            if !previous.contains_key(&next) {
                previous.insert(next, node);
                queue.push_back(next);
            }
        }
    }

    let mut path = Vec::new();
    let mut current = closing;
    while let Some(node) = current {
        path.push(node);
        if node == start {
            break;
        }
        current = previous.get(&node).copied();
    }
    path.reverse();
    if path.is_empty() {
        path.push(start);
    }
    path
}

#[cfg(test)]
#[path = "quantity_test.rs"]
mod tests;
