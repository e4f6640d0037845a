use super::*;
use rollup_core::{
    EstimateId, LineItemId, Product, ProductId, StaticClassificationLookup, UnitCosts,
};

fn item(id: &str, cost: f64) -> LineItem {
    let mut item = LineItem::new(LineItemId::new(id), EstimateId::new("est"));
    item.quantity = Some(1.0);
    item.costs = UnitCosts {
        total_uc: Some(cost),
        ..UnitCosts::default()
    };
    item
}

fn mf(levels: &[(u8, &str)]) -> ClassificationCodes {
    ClassificationCodes::from_levels(levels.iter().map(|(l, c)| (*l, *c)))
}

struct Fixture {
    items: Vec<LineItem>,
    products: Vec<Product>,
}

impl Fixture {
    fn new() -> Self {
        let mut concrete = item("concrete", 100.0);
        concrete.mf = mf(&[(1, "03 00 00"), (2, "03 30 00")]);
        let mut rebar = item("rebar", 40.0);
        rebar.mf = mf(&[(1, "03 00 00")]);
        let mut paint = item("paint", 10.0);
        paint.product = Some(ProductId::new("p-paint"));
        let bare = item("bare", 5.0);

        let mut product = Product::new(ProductId::new("p-paint"));
        product.mf = mf(&[(1, "09 00 00"), (2, "09 91 00")]);

        Self {
            items: vec![concrete, rebar, paint, bare],
            products: vec![product],
        }
    }

    fn totals(&self, depth: ClassificationDepth) -> ClassificationTotals {
        let arena = LineItemArena::build(&self.items).unwrap();
        let rollup = AssemblyRollup::compute(&arena, &vec![1.0; arena.len()]);
        let products = ProductIndex::new(&self.products);
        classification_totals(&arena, &rollup, &arena.post_order(), &products, depth)
    }
}

fn level_sum(totals: &ClassificationTotals, level: u8) -> f64 {
    totals.scheme(ClassificationScheme::Mf)[&level].values().sum()
}

#[test]
fn test_every_level_sums_to_subtotal() {
    let totals = Fixture::new().totals(ClassificationDepth::All);

    assert_eq!(level_sum(&totals, 1), 155.0);
    assert_eq!(level_sum(&totals, 2), 155.0);
    let mf = ClassificationScheme::Mf;
    assert_eq!(totals.get(mf, 1, "03 00 00"), Some(140.0));
    assert_eq!(totals.get(mf, 2, "03 30 00"), Some(100.0));
    assert_eq!(totals.get(mf, 2, UNCLASSIFIED), Some(45.0));
}

#[test]
fn test_product_codes_fill_in_for_uncoded_item() {
    let totals = Fixture::new().totals(ClassificationDepth::All);
    let mf = ClassificationScheme::Mf;
    assert_eq!(totals.get(mf, 1, "09 00 00"), Some(10.0));
    assert_eq!(totals.get(mf, 2, "09 91 00"), Some(10.0));
    assert_eq!(totals.get(mf, 1, UNCLASSIFIED), Some(5.0));
}

#[test]
fn test_deepest_counts_each_item_once() {
    let totals = Fixture::new().totals(ClassificationDepth::Deepest);
    let mf = ClassificationScheme::Mf;

    assert_eq!(totals.get(mf, 2, "03 30 00"), Some(100.0));
    assert_eq!(totals.get(mf, 1, "03 00 00"), Some(40.0));
    let all: f64 = totals.mf.values().flat_map(|codes| codes.values()).sum();
    assert_eq!(all, 155.0);
    // Nothing carries UniFormat codes
    assert!(totals.uf.is_empty());
}

#[test]
fn test_uncoded_scheme_omitted_at_every_depth() {
    for depth in [ClassificationDepth::All, ClassificationDepth::Deepest] {
        let totals = Fixture::new().totals(depth);
        assert!(totals.uf.is_empty(), "{depth:?}");
        assert!(!totals.mf.is_empty(), "{depth:?}");
    }
}

#[test]
fn test_sort_totals_group_by_field_and_code() {
    let mut a = item("a", 30.0);
    a.extras
        .insert(SortFieldId::new("bid"), SortCodeId::new("pkg-1"));
    let mut b = item("b", 20.0);
    b.extras
        .insert(SortFieldId::new("bid"), SortCodeId::new("pkg-1"));
    let mut c = item("c", 5.0);
    c.extras
        .insert(SortFieldId::new("bid"), SortCodeId::new("pkg-2"));
    let items = vec![a, b, c, item("d", 1.0)];

    let arena = LineItemArena::build(&items).unwrap();
    let rollup = AssemblyRollup::compute(&arena, &vec![1.0; arena.len()]);
    let totals = sort_totals(
        &arena,
        &rollup,
        &arena.post_order(),
        &ProductIndex::default(),
    );

    let bid = &totals[&SortFieldId::new("bid")];
    assert_eq!(bid[&SortCodeId::new("pkg-1")], 50.0);
    assert_eq!(bid[&SortCodeId::new("pkg-2")], 5.0);
}

#[test]
fn test_describe_joins_lookup_descriptions() {
    let totals = Fixture::new().totals(ClassificationDepth::All);
    let mut lookup = StaticClassificationLookup::new();
    lookup.insert(ClassificationScheme::Mf, "03 00 00", "Concrete");

    let rows = describe_classification(&totals, &lookup);
    let concrete = rows
        .iter()
        .find(|r| r.level == 1 && r.code == "03 00 00")
        .unwrap();
    assert_eq!(concrete.description.as_deref(), Some("Concrete"));
    assert_eq!(concrete.cost, 140.0);
    let unknown = rows.iter().find(|r| r.code == "09 91 00").unwrap();
    assert_eq!(unknown.description, None);
    // Rows come out ordered by level
    assert!(rows.windows(2).all(|w| w[0].level <= w[1].level));
}
