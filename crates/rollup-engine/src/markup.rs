//! Markup application
//!
//! Markups are applied one at a time in ascending `order`. Each one reads the
//! running subtotal left by the previous markup, so percentages compound and
//! reordering changes the result. The running subtotal is tracked per
//! use-group bucket so restricted markups only see the groups they name.

use crate::error::{AggregationError, AggregationResult, ReferenceKind};
use rollup_core::{
    EstimateMarkup, EstimateUseGroup, FormulaEvaluator, FormulaVariableConfig, MarkupContribution,
    MarkupKind, MarkupSource, UseGroupKey,
};
use std::collections::{BTreeMap, HashSet};

/// Result of layering every active markup over the allocated direct cost
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupOutcome {
    /// One entry per applied markup, in application order
    pub contributions: Vec<MarkupContribution>,
    /// Marked-up cost per use-group bucket
    pub by_use_group: BTreeMap<UseGroupKey, f64>,
    /// Running subtotal after the last markup
    pub total: f64,
}

/// Apply `markups` over `allocated` (direct cost per use-group bucket).
///
/// Soft-deleted markups and markups belonging to an alternate are skipped.
pub fn apply_markups<E>(
    markups: &[EstimateMarkup],
    allocated: &BTreeMap<UseGroupKey, f64>,
    use_groups: &[EstimateUseGroup],
    evaluator: &E,
    variables: &FormulaVariableConfig,
    tolerance: f64,
) -> AggregationResult<MarkupOutcome>
where
    E: FormulaEvaluator + ?Sized,
{
    let mut active: Vec<&EstimateMarkup> = markups
        .iter()
        .filter(|m| m.deleted_at.is_none() && m.alternate.is_none())
        .collect();
    active.sort_by(|a, b| a.application_order(b));

    let groups = GroupSet::new(use_groups);
    let names = use_group_variables(use_groups, variables);

    let mut running = allocated.clone();
    let mut running_total: f64 = allocated.values().sum();
    let mut contributions = Vec::with_capacity(active.len());

    for markup in active {
        let Some(source) = markup.source() else {
            log::warn!("Markup '{}' has no percentage, value, or formula; skipping", markup.id);
            continue;
        };

        let scoped: Vec<(UseGroupKey, f64)> = markup_scope(markup, &running, &groups)?
            .into_iter()
            .map(|(key, weight)| {
                let value = running.get(&key).copied().unwrap_or(0.0) * weight;
                (key, value)
            })
            .collect();
        let base: f64 = scoped.iter().map(|(_, v)| v).sum();

        let (kind, amount, shares) = match source {
            MarkupSource::Percentage(pct) => {
                let shares: BTreeMap<UseGroupKey, f64> = scoped
                    .iter()
                    .map(|(key, value)| (key.clone(), value * pct / 100.0))
                    .collect();
                (MarkupKind::Percentage, base * pct / 100.0, shares)
            }
            MarkupSource::Value(value) => {
                (MarkupKind::Value, value, spread(value, &scoped, base, tolerance))
            }
            MarkupSource::Formula(formula) => {
                let mut bound = BTreeMap::new();
                bound.insert(variables.subtotal_name.clone(), base);
                bound.insert(variables.total_name.clone(), running_total);
                for (name, key) in &names {
                    bound.insert(name.clone(), running.get(key).copied().unwrap_or(0.0));
                }
                let amount = evaluator.evaluate(formula, &bound).map_err(|source| {
                    AggregationError::Formula {
                        entity: format!("markup '{}'", markup.id),
                        source,
                    }
                })?;
                (MarkupKind::Formula, amount, spread(amount, &scoped, base, tolerance))
            }
        };

        for (key, share) in &shares {
            *running.entry(key.clone()).or_insert(0.0) += share;
        }
        running_total += amount;

        log::debug!(
            "Applied markup '{}' ({:?}): base {} amount {} running {}",
            markup.id,
            kind,
            base,
            amount,
            running_total
        );
        contributions.push(MarkupContribution {
            markup_id: markup.id.clone(),
            description: markup.description.clone(),
            order: markup.order,
            kind,
            base,
            amount,
            running_total,
            by_use_group: shares,
        });
    }

    Ok(MarkupOutcome {
        contributions,
        by_use_group: running,
        total: running_total,
    })
}

struct GroupSet<'a> {
    active: HashSet<&'a str>,
    deleted: HashSet<&'a str>,
}

impl<'a> GroupSet<'a> {
    fn new(use_groups: &'a [EstimateUseGroup]) -> Self {
        let (active, deleted): (Vec<_>, Vec<_>) =
            use_groups.iter().partition(|g| g.deleted_at.is_none());
        Self {
            active: active.into_iter().map(|g| g.id.as_str()).collect(),
            deleted: deleted.into_iter().map(|g| g.id.as_str()).collect(),
        }
    }
}

/// Buckets a markup applies to, with the weight applied to each
fn markup_scope(
    markup: &EstimateMarkup,
    running: &BTreeMap<UseGroupKey, f64>,
    groups: &GroupSet<'_>,
) -> AggregationResult<Vec<(UseGroupKey, f64)>> {
    if !markup.is_restricted() {
        return Ok(running.keys().map(|key| (key.clone(), 1.0)).collect());
    }

    let mut scope = Vec::with_capacity(markup.estimate_use_groups.len());
    for (group, weight) in &markup.estimate_use_groups {
        if groups.active.contains(group.as_str()) {
            scope.push((
                UseGroupKey::Assigned(group.clone()),
                weight.unwrap_or(100.0) / 100.0,
            ));
        } else if groups.deleted.contains(group.as_str()) {
            log::warn!(
                "Markup '{}' is restricted to deleted use group '{}'; ignoring it",
                markup.id,
                group
            );
        } else {
            return Err(AggregationError::MissingReference {
                kind: ReferenceKind::UseGroup,
                id: group.to_string(),
                referrer: format!("markup '{}'", markup.id),
            });
        }
    }
    Ok(scope)
}

/// Split a flat amount across buckets in proportion to their scoped base.
/// A base within `tolerance` of zero splits evenly; an empty scope goes to
/// `Unassigned`.
fn spread(
    amount: f64,
    scoped: &[(UseGroupKey, f64)],
    base: f64,
    tolerance: f64,
) -> BTreeMap<UseGroupKey, f64> {
    if scoped.is_empty() {
        return BTreeMap::from([(UseGroupKey::Unassigned, amount)]);
    }
    if base.abs() <= tolerance {
        let even = amount / scoped.len() as f64;
        return scoped.iter().map(|(key, _)| (key.clone(), even)).collect();
    }
    scoped
        .iter()
        .map(|(key, value)| (key.clone(), amount * value / base))
        .collect()
}

/// Formula variable names for each use-group bucket. Labels that slug to an
/// already-taken name get a `_2`, `_3`, ... suffix in use-group order.
fn use_group_variables(
    use_groups: &[EstimateUseGroup],
    config: &FormulaVariableConfig,
) -> Vec<(String, UseGroupKey)> {
    let mut active: Vec<&EstimateUseGroup> =
        use_groups.iter().filter(|g| g.deleted_at.is_none()).collect();
    active.sort_by(|a, b| a.order.total_cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

    let mut taken: HashSet<String> =
        HashSet::from([config.subtotal_name.clone(), config.total_name.clone()]);
    let labelled = active
        .into_iter()
        .map(|g| (g.label(), UseGroupKey::Assigned(g.id.clone())))
        .chain(std::iter::once(("unassigned", UseGroupKey::Unassigned)));

    let mut names = Vec::new();
    for (label, key) in labelled {
        let stem = config.use_group_variable(label);
        let mut name = stem.clone();
        let mut n = 2;
        while taken.contains(&name) {
            name = format!("{stem}_{n}");
            n += 1;
        }
        taken.insert(name.clone());
        names.push((name, key));
    }
    names
}

#[cfg(test)]
#[path = "markup_test.rs"]
mod tests;
