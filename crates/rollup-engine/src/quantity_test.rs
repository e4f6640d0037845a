use super::*;
use chrono::Utc;
use rollup_core::{EstimateId, LineItem, Product, ProductId};
use rollup_formula::ExpressionEvaluator;

fn item(id: &str, parent: Option<&str>) -> LineItem {
    let mut item = LineItem::new(LineItemId::new(id), EstimateId::new("est"));
    item.parent = parent.map(LineItemId::new);
    item
}

fn literal(id: &str, parent: Option<&str>, quantity: f64) -> LineItem {
    let mut item = item(id, parent);
    item.quantity = Some(quantity);
    item
}

fn with_formula(mut item: LineItem, formula: QuantityFormula) -> LineItem {
    item.quantity_formula = Some(formula);
    item
}

fn resolve(items: &[LineItem], products: &[Product]) -> AggregationResult<BTreeMap<String, f64>> {
    resolve_with(items, products, &BTreeMap::new())
}

fn resolve_with(
    items: &[LineItem],
    products: &[Product],
    external: &BTreeMap<LineItemId, f64>,
) -> AggregationResult<BTreeMap<String, f64>> {
    let arena = LineItemArena::build_branch(items)?;
    let products = ProductIndex::new(products);
    let values = resolve_quantities(&arena, &products, &ExpressionEvaluator::new(), external)?;
    Ok(arena
        .iter()
        .map(|(k, item)| (item.id.to_string(), values[k]))
        .collect())
}

#[test]
fn test_literal_quantity_unchanged() {
    let q = resolve(&[literal("a", None, 12.5)], &[]).unwrap();
    assert_eq!(q["a"], 12.5);
}

#[test]
fn test_formula_reads_bound_quantities() {
    let items = vec![
        literal("w", None, 10.0),
        literal("h", None, 4.0),
        with_formula(
            item("area", None),
            QuantityFormula::new("w * h")
                .bind("w", LineItemId::new("w"))
                .bind("h", LineItemId::new("h")),
        ),
    ];
    let q = resolve(&items, &[]).unwrap();
    assert_eq!(q["area"], 40.0);
}

#[test]
fn test_formula_chain_resolves_in_dependency_order() {
    // Declared in reverse so insertion order cannot be relied on
    let items = vec![
        with_formula(
            item("c", None),
            QuantityFormula::new("b + 1").bind("b", LineItemId::new("b")),
        ),
        with_formula(
            item("b", None),
            QuantityFormula::new("a * 2").bind("a", LineItemId::new("a")),
        ),
        literal("a", None, 3.0),
    ];
    let q = resolve(&items, &[]).unwrap();
    assert_eq!(q["b"], 6.0);
    assert_eq!(q["c"], 7.0);
}

#[test]
fn test_non_sta_assembly_sums_children_over_stale_quantity() {
    let items = vec![
        literal("parent", None, 99.0),
        literal("c1", Some("parent"), 4.0),
        literal("c2", Some("parent"), 6.0),
    ];
    let q = resolve(&items, &[]).unwrap();
    assert_eq!(q["parent"], 10.0);
}

#[test]
fn test_sta_assembly_keeps_own_quantity() {
    let mut parent = literal("parent", None, 10.0);
    parent.selected_traditional_assembly = true;
    let items = vec![
        parent,
        literal("c1", Some("parent"), 4.0),
        literal("c2", Some("parent"), 7.0),
    ];
    let q = resolve(&items, &[]).unwrap();
    assert_eq!(q["parent"], 10.0);
}

#[test]
fn test_sta_child_uses_product_ratio() {
    let mut wall = Product::new(ProductId::new("p-wall"));
    wall.children.insert(ProductId::new("p-stud"), 0.75);
    let mut parent = literal("wall", None, 40.0);
    parent.selected_traditional_assembly = true;
    parent.product = Some(ProductId::new("p-wall"));
    let mut stud = item("stud", Some("wall"));
    stud.product = Some(ProductId::new("p-stud"));

    let q = resolve(&[parent, stud], &[wall, Product::new(ProductId::new("p-stud"))]).unwrap();
    assert_eq!(q["stud"], 30.0);
}

#[test]
fn test_product_default_formula_used_without_quantity() {
    let mut product = Product::new(ProductId::new("p-pad"));
    product.quantity_formula = Some(QuantityFormula::new("2 + 3"));
    let mut pad = item("pad", None);
    pad.product = Some(ProductId::new("p-pad"));

    let q = resolve(&[pad], &[product]).unwrap();
    assert_eq!(q["pad"], 5.0);
}

#[test]
fn test_mutual_formulas_report_cycle() {
    let items = vec![
        with_formula(
            item("a", None),
            QuantityFormula::new("b").bind("b", LineItemId::new("b")),
        ),
        with_formula(
            item("b", None),
            QuantityFormula::new("a").bind("a", LineItemId::new("a")),
        ),
    ];
    match resolve(&items, &[]).unwrap_err() {
        AggregationError::CyclicFormula { cycle } => {
            assert_eq!(cycle.len(), 2);
            assert!(cycle.iter().any(|id| id == "a"));
            assert!(cycle.iter().any(|id| id == "b"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_self_reference_reports_cycle() {
    let items = vec![with_formula(
        item("a", None),
        QuantityFormula::new("a + 1").bind("a", LineItemId::new("a")),
    )];
    match resolve(&items, &[]).unwrap_err() {
        AggregationError::CyclicFormula { cycle } => assert_eq!(cycle, vec![LineItemId::new("a")]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_reference_to_deleted_item_is_unresolved() {
    let mut gone = literal("gone", None, 5.0);
    gone.deleted_at = Some(Utc::now());
    let items = vec![
        gone,
        with_formula(
            item("a", None),
            QuantityFormula::new("g * 2").bind("g", LineItemId::new("gone")),
        ),
    ];
    match resolve(&items, &[]).unwrap_err() {
        AggregationError::UnresolvedReference { line_item, reason } => {
            assert_eq!(line_item, "a");
            assert!(reason.contains("deleted"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_item_without_any_source_is_unresolved() {
    let err = resolve(&[item("bare", None)], &[]).unwrap_err();
    assert!(matches!(err, AggregationError::UnresolvedReference { .. }));
}

#[test]
fn test_external_quantity_satisfies_reference() {
    let items = vec![with_formula(
        item("a", None),
        QuantityFormula::new("outside / 2").bind("outside", LineItemId::new("outside")),
    )];
    let external = BTreeMap::from([(LineItemId::new("outside"), 9.0)]);
    let q = resolve_with(&items, &[], &external).unwrap();
    assert_eq!(q["a"], 4.5);
}

#[test]
fn test_evaluator_failure_names_line_item() {
    let items = vec![with_formula(item("a", None), QuantityFormula::new("nope * 2"))];
    match resolve(&items, &[]).unwrap_err() {
        AggregationError::Formula { entity, .. } => assert!(entity.contains("'a'"), "{entity}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_literal_quantity_wins_over_own_formula() {
    let both = with_formula(literal("a", None, 7.0), QuantityFormula::new("2 + 3"));
    let q = resolve(&[both], &[]).unwrap();
    assert_eq!(q["a"], 7.0);
}
