//! Line-item arena: an indexed, validated view of one estimate's forest
//!
//! Items are stored in a flat vector and referenced by position; parent and
//! child links are positions too. Building the arena checks for duplicate ids,
//! dangling parents and parent cycles, and drops soft-deleted items together
//! with everything beneath them.

use crate::error::{AggregationError, AggregationResult, ReferenceKind};
use rollup_core::{LineItem, LineItemId};
use std::collections::{HashMap, HashSet};

/// How to treat a parent id that is not among the supplied items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParentPolicy {
    /// Dangling parents are a `MissingReference`
    Strict,
    /// Dangling parents make the item a top-level root (preview branches)
    Branch,
}

#[derive(Debug)]
pub struct LineItemArena<'a> {
    items: Vec<&'a LineItem>,
    index: HashMap<&'a str, usize>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    /// Every subtree root, including detached alternate branches
    roots: Vec<usize>,
    /// Roots whose parent is absent (as opposed to detached alternates)
    top_level: Vec<usize>,
    excluded: HashSet<&'a str>,
}

impl<'a> LineItemArena<'a> {
    /// Build the arena for a full estimate
    pub fn build(items: &'a [LineItem]) -> AggregationResult<Self> {
        Self::build_with(items, ParentPolicy::Strict)
    }

    /// Build the arena for a partial forest whose roots may point at parents
    /// outside `items`
    pub fn build_branch(items: &'a [LineItem]) -> AggregationResult<Self> {
        Self::build_with(items, ParentPolicy::Branch)
    }

    fn build_with(items: &'a [LineItem], policy: ParentPolicy) -> AggregationResult<Self> {
        let mut all: HashMap<&str, usize> = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if all.insert(item.id.as_str(), i).is_some() {
                return Err(AggregationError::DuplicateLineItem(item.id.clone()));
            }
        }

        let mut parent_of: Vec<Option<usize>> = Vec::with_capacity(items.len());
        for item in items {
            let resolved = match &item.parent {
                None => None,
                Some(parent) => match all.get(parent.as_str()) {
                    Some(&p) => Some(p),
                    None if policy == ParentPolicy::Branch => None,
                    None => {
                        return Err(AggregationError::MissingReference {
                            kind: ReferenceKind::ParentLineItem,
                            id: parent.to_string(),
                            referrer: format!("line item '{}'", item.id),
                        })
                    }
                },
            };
            parent_of.push(resolved);
        }

        check_parent_cycles(items, &parent_of)?;
        let excluded_flags = excluded_flags(items, &parent_of);

        let mut arena = Self {
            items: Vec::new(),
            index: HashMap::new(),
            parent: Vec::new(),
            children: Vec::new(),
            roots: Vec::new(),
            top_level: Vec::new(),
            excluded: HashSet::new(),
        };

        let mut position: Vec<Option<usize>> = vec![None; items.len()];
        for (i, item) in items.iter().enumerate() {
            if excluded_flags[i] {
                arena.excluded.insert(item.id.as_str());
                continue;
            }
            position[i] = Some(arena.items.len());
            arena.index.insert(item.id.as_str(), arena.items.len());
            arena.items.push(item);
        }
        arena.parent = vec![None; arena.items.len()];
        arena.children = vec![Vec::new(); arena.items.len()];

        for (i, item) in items.iter().enumerate() {
            let Some(k) = position[i] else { continue };
            // An active item's parent is active, otherwise it would be excluded
            let attached = parent_of[i].and_then(|p| position[p].map(|pk| (p, pk)));
            match attached {
                None => {
                    arena.roots.push(k);
                    arena.top_level.push(k);
                }
                Some((p, _))
                    if item.alternate.is_some() && items[p].alternate != item.alternate =>
                {
                    log::debug!(
                        "Line item '{}' starts a detached alternate branch",
                        item.id
                    );
                    arena.roots.push(k);
                }
                Some((_, pk)) => {
                    arena.parent[k] = Some(pk);
                    arena.children[pk].push(k);
                }
            }
        }

        let sorted = |list: &mut Vec<usize>, items: &[&LineItem]| {
            list.sort_by(|&a, &b| {
                let (a, b) = (items[a], items[b]);
                (a.order.as_deref(), a.id.as_str()).cmp(&(b.order.as_deref(), b.id.as_str()))
            });
        };
        for k in 0..arena.children.len() {
            let mut list = std::mem::take(&mut arena.children[k]);
            sorted(&mut list, &arena.items);
            arena.children[k] = list;
        }
        let mut roots = std::mem::take(&mut arena.roots);
        sorted(&mut roots, &arena.items);
        arena.roots = roots;
        let mut top_level = std::mem::take(&mut arena.top_level);
        sorted(&mut top_level, &arena.items);
        arena.top_level = top_level;

        log::debug!(
            "Built line item arena: {} active, {} excluded, {} roots",
            arena.items.len(),
            arena.excluded.len(),
            arena.roots.len()
        );
        Ok(arena)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at an arena position
    pub fn item(&self, k: usize) -> &'a LineItem {
        self.items[k]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a LineItem)> + '_ {
        self.items.iter().copied().enumerate()
    }

    pub fn index_of(&self, id: &LineItemId) -> Option<usize> {
        self.index.get(id.as_str()).copied()
    }

    /// True when the id belongs to a soft-deleted item or a deleted subtree
    pub fn is_excluded(&self, id: &LineItemId) -> bool {
        self.excluded.contains(id.as_str())
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }

    pub fn parent(&self, k: usize) -> Option<usize> {
        self.parent[k]
    }

    /// Attached children in display order
    pub fn children(&self, k: usize) -> &[usize] {
        &self.children[k]
    }

    pub fn is_leaf(&self, k: usize) -> bool {
        self.children[k].is_empty()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn top_level(&self) -> &[usize] {
        &self.top_level
    }

    /// Roots that count toward the base estimate
    pub fn base_roots(&self) -> Vec<usize> {
        self.roots
            .iter()
            .copied()
            .filter(|&k| self.items[k].alternate.is_none())
            .collect()
    }

    /// Roots of alternate branches
    pub fn alternate_roots(&self) -> Vec<usize> {
        self.roots
            .iter()
            .copied()
            .filter(|&k| self.items[k].alternate.is_some())
            .collect()
    }

    /// Children before parents, starting from `roots`
    pub fn post_order_from(&self, roots: &[usize]) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.items.len());
        let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();
        while let Some((k, expanded)) = stack.pop() {
            if expanded {
                out.push(k);
                continue;
            }
            stack.push((k, true));
            for &child in self.children[k].iter().rev() {
                stack.push((child, false));
            }
        }
        out
    }

    /// Children before parents across the whole forest
    pub fn post_order(&self) -> Vec<usize> {
        self.post_order_from(&self.roots)
    }
}

fn check_parent_cycles(items: &[LineItem], parent_of: &[Option<usize>]) -> AggregationResult<()> {
    const UNVISITED: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNVISITED; items.len()];
    for start in 0..items.len() {
        let mut path: Vec<usize> = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            match state[i] {
                DONE => break,
                ON_PATH => {
                    let from = path.iter().position(|&p| p == i).unwrap_or(0);
                    let cycle = path[from..]
                        .iter()
                        .map(|&k| items[k].id.clone())
                        .collect();
                    return Err(AggregationError::CyclicAssembly { cycle });
                }
                _ => {
                    state[i] = ON_PATH;
                    path.push(i);
                    current = parent_of[i];
                }
            }
        }
        for i in path {
            state[i] = DONE;
        }
    }
    Ok(())
}

/// Deleted items and every descendant of one
fn excluded_flags(items: &[LineItem], parent_of: &[Option<usize>]) -> Vec<bool> {
    let mut flags: Vec<Option<bool>> = vec![None; items.len()];
    for start in 0..items.len() {
        let mut chain = Vec::new();
        let mut current = Some(start);
        let mut verdict = false;
        while let Some(i) = current {
            if let Some(known) = flags[i] {
                verdict = known;
                break;
            }
            if items[i].is_deleted() {
                verdict = true;
                flags[i] = Some(true);
                break;
            }
            chain.push(i);
            current = parent_of[i];
        }
        for i in chain {
            flags[i] = Some(verdict);
        }
    }
    flags.into_iter().map(|f| f.unwrap_or(false)).collect()
}

#[cfg(test)]
#[path = "arena_test.rs"]
mod tests;
