//! Behavioral properties of the rollup: markup ordering, conservation,
//! soft deletes, cycles, assembly quantities and idempotence

use proptest::prelude::*;
use rollup_core::{
    ClassificationCodes, ClassificationScheme, Estimate, EstimateId, EstimateMarkup,
    EstimateSnapshot, EstimateUseGroup, EstimateUseGroupId, LineItem, LineItemId, MarkupId,
    ProjectId, QuantityFormula, RollupConfig, UnitCosts, UseGroupId,
};
use rollup_engine::{compute_stats, AggregationError, ComputedStats};
use rollup_formula::ExpressionEvaluator;

fn snapshot() -> EstimateSnapshot {
    let mut snapshot = EstimateSnapshot::new(Estimate::new(
        EstimateId::new("est"),
        ProjectId::new("proj"),
    ));
    snapshot.use_groups = ["g1", "g2"]
        .iter()
        .map(|id| {
            EstimateUseGroup::new(
                EstimateUseGroupId::new(*id),
                EstimateId::new("est"),
                UseGroupId::new(*id),
            )
        })
        .collect();
    snapshot
}

fn item(id: &str, parent: Option<&str>, quantity: Option<f64>, unit_cost: f64) -> LineItem {
    let mut item = LineItem::new(LineItemId::new(id), EstimateId::new("est"));
    item.parent = parent.map(LineItemId::new);
    item.quantity = quantity;
    item.costs = UnitCosts {
        total_uc: Some(unit_cost),
        ..UnitCosts::default()
    };
    item
}

fn percentage(id: &str, order: f64, pct: f64) -> EstimateMarkup {
    let mut markup = EstimateMarkup::new(MarkupId::new(id), EstimateId::new("est"), order);
    markup.percentage = Some(pct);
    markup
}

fn compute(snapshot: &EstimateSnapshot) -> Result<ComputedStats, AggregationError> {
    compute_stats(snapshot, &ExpressionEvaluator::new(), &RollupConfig::default())
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_markups_compound_in_order() {
    let mut snapshot = snapshot();
    snapshot.line_items = vec![item("base", None, Some(1000.0), 1.0)];
    snapshot.markups = vec![percentage("a", 1.0, 10.0), percentage("b", 2.0, 5.0)];

    let stats = compute(&snapshot).unwrap().into_preview();
    let running: Vec<f64> = stats.total_by_markup.iter().map(|m| m.running_total).collect();
    assert_close(running[0], 1100.0);
    assert_close(running[1], 1155.0);
    assert_close(stats.total_cost, 1155.0);
}

#[test]
fn test_swapped_order_changes_breakdown() {
    let mut snapshot = snapshot();
    snapshot.line_items = vec![item("base", None, Some(1000.0), 1.0)];
    snapshot.markups = vec![percentage("a", 2.0, 10.0), percentage("b", 1.0, 5.0)];

    let stats = compute(&snapshot).unwrap().into_preview();
    assert_eq!(stats.total_by_markup[0].markup_id, "b");
    assert_close(stats.total_by_markup[0].running_total, 1050.0);
    // A now applies to 1050, not 1000
    assert_close(stats.total_by_markup[1].amount, 105.0);
}

#[test]
fn test_overallocated_line_item_fails_whole_run() {
    let mut snapshot = snapshot();
    let mut over = item("over", None, Some(1.0), 100.0);
    over.estimate_use_groups
        .insert(EstimateUseGroupId::new("g1"), 60.0);
    over.estimate_use_groups
        .insert(EstimateUseGroupId::new("g2"), 50.0);
    snapshot.line_items = vec![item("fine", None, Some(1.0), 5.0), over];

    match compute(&snapshot).unwrap_err() {
        AggregationError::OverallocatedUseGroup { line_item, total } => {
            assert_eq!(line_item, "over");
            assert_close(total, 110.0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_soft_deleted_child_leaves_totals() {
    let mut snapshot = snapshot();
    snapshot.line_items = vec![
        item("parent", None, None, 0.0),
        item("keep", Some("parent"), Some(2.0), 10.0),
        item("drop", Some("parent"), Some(3.0), 10.0),
    ];
    let before = compute(&snapshot).unwrap().into_preview();

    snapshot.line_items[2].deleted_at = Some(chrono::Utc::now());
    let after = compute(&snapshot).unwrap().into_preview();

    assert_close(before.subtotal, 50.0);
    assert_close(after.subtotal, 20.0);
    assert_eq!(after.line_item_count, 2);
}

#[test]
fn test_formula_on_deleted_item_is_unresolved() {
    let mut snapshot = snapshot();
    let mut gone = item("gone", None, Some(3.0), 1.0);
    gone.deleted_at = Some(chrono::Utc::now());
    let mut reader = item("reader", None, None, 1.0);
    reader.quantity_formula =
        Some(QuantityFormula::new("g * 2").bind("g", LineItemId::new("gone")));
    snapshot.line_items = vec![gone, reader];

    assert!(matches!(
        compute(&snapshot).unwrap_err(),
        AggregationError::UnresolvedReference { .. }
    ));
}

#[test]
fn test_mutual_formula_reference_names_cycle() {
    let mut snapshot = snapshot();
    let mut a = item("A", None, None, 1.0);
    a.quantity_formula = Some(QuantityFormula::new("b + 1").bind("b", LineItemId::new("B")));
    let mut b = item("B", None, None, 1.0);
    b.quantity_formula = Some(QuantityFormula::new("a + 1").bind("a", LineItemId::new("A")));
    snapshot.line_items = vec![a, b];

    let err = compute(&snapshot).unwrap_err();
    let message = err.to_string();
    match err {
        AggregationError::CyclicFormula { cycle } => {
            assert!(cycle.iter().any(|id| id == "A"));
            assert!(cycle.iter().any(|id| id == "B"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(message.starts_with("[R001]"));
}

#[test]
fn test_sta_quantity_is_not_child_sum() {
    let mut snapshot = snapshot();
    let mut sta = item("sta", None, Some(10.0), 0.0);
    sta.selected_traditional_assembly = true;
    snapshot.line_items = vec![
        sta,
        item("c1", Some("sta"), Some(4.0), 1.0),
        item("c2", Some("sta"), Some(7.0), 1.0),
        item("plain", None, Some(99.0), 1.0),
        item("p1", Some("plain"), Some(4.0), 0.0),
        item("p2", Some("plain"), Some(6.0), 0.0),
    ];

    let stats = compute(&snapshot).unwrap().into_preview();
    // sta: 0 + 4 + 7; plain: 10 (not the stale 99) x 1
    assert_close(stats.subtotal, 11.0 + 10.0);
}

#[test]
fn test_input_snapshot_untouched() {
    let mut snapshot = snapshot();
    let mut stale = item("stale", None, Some(2.0), 3.0);
    stale.total_cost = Some(1.0);
    snapshot.line_items = vec![stale];
    let before = snapshot.clone();

    compute(&snapshot).unwrap();
    assert_eq!(snapshot, before);
}

#[derive(Debug, Clone)]
struct ItemSpec {
    parent: usize,
    quantity: f64,
    unit_cost: f64,
    g1: f64,
    g2: f64,
    sta: bool,
    code: Option<u8>,
}

fn item_spec() -> impl Strategy<Value = ItemSpec> {
    (
        0usize..64,
        0.0f64..1000.0,
        -50.0f64..500.0,
        0.0f64..=50.0,
        0.0f64..=50.0,
        any::<bool>(),
        prop::option::of(0u8..4),
    )
        .prop_map(|(parent, quantity, unit_cost, g1, g2, sta, code)| ItemSpec {
            parent,
            quantity,
            unit_cost,
            g1,
            g2,
            sta,
            code,
        })
}

fn build(specs: &[ItemSpec], markups: &[(f64, u8)]) -> EstimateSnapshot {
    let mut snapshot = snapshot();
    snapshot.line_items = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            // Parents always precede children, so the forest is acyclic
            let parent = (i > 0 && spec.parent % 3 != 0).then(|| format!("li-{}", spec.parent % i));
            let mut li = item(
                &format!("li-{i}"),
                parent.as_deref(),
                Some(spec.quantity),
                spec.unit_cost,
            );
            li.selected_traditional_assembly = spec.sta;
            li.estimate_use_groups
                .insert(EstimateUseGroupId::new("g1"), spec.g1);
            li.estimate_use_groups
                .insert(EstimateUseGroupId::new("g2"), spec.g2);
            if let Some(code) = spec.code {
                li.mf = ClassificationCodes::from_levels([(1, format!("0{code} 00 00"))]);
            }
            li
        })
        .collect();
    snapshot.markups = markups
        .iter()
        .enumerate()
        .map(|(i, (pct, order))| percentage(&format!("mk-{i}"), f64::from(*order), *pct))
        .collect();
    snapshot
}

proptest! {
    #[test]
    fn prop_buckets_conserve_cost(
        specs in prop::collection::vec(item_spec(), 1..40),
        markups in prop::collection::vec((0.0f64..25.0, 0u8..10), 0..4),
    ) {
        let snapshot = build(&specs, &markups);
        let stats = compute(&snapshot).unwrap().into_preview();
        let tolerance = 1e-6 * (1.0 + stats.subtotal.abs() + stats.total_cost.abs());

        let by_use_group: f64 = stats.total_by_use_group.values().sum();
        prop_assert!((by_use_group - stats.subtotal).abs() < tolerance);

        let level_one: f64 = stats
            .total_by_classification
            .scheme(ClassificationScheme::Mf)
            .get(&1)
            .map(|codes| codes.values().sum())
            .unwrap_or(stats.subtotal);
        prop_assert!((level_one - stats.subtotal).abs() < tolerance);

        let marked_up: f64 = stats.use_groups.iter().map(|g| g.marked_up_cost).sum();
        prop_assert!((marked_up - stats.total_cost).abs() < tolerance);

        let mut running = stats.subtotal;
        for markup in &stats.total_by_markup {
            running += markup.amount;
            prop_assert!((markup.running_total - running).abs() < tolerance);
        }
        prop_assert!((running - stats.total_cost).abs() < tolerance);
    }

    #[test]
    fn prop_recompute_is_idempotent(
        specs in prop::collection::vec(item_spec(), 1..20),
        markups in prop::collection::vec((0.0f64..25.0, 0u8..10), 0..3),
    ) {
        let snapshot = build(&specs, &markups);
        let first = compute(&snapshot).unwrap().into_preview();
        let second = compute(&snapshot).unwrap().into_preview();
        prop_assert_eq!(first.fingerprint, second.fingerprint);
    }
}
