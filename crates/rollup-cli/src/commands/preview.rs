//! Preview command implementation

use anyhow::{bail, Context, Result};
use rollup_core::{EstimateId, LineItem, LineItemId};
use rollup_engine::{branch_items, preview_aggregate, PreviewContext, SubtreeStats};
use rollup_formula::ExpressionEvaluator;
use rollup_store::{fetch_snapshot, MemoryStore, RecordStore};

use crate::cli::{GlobalArgs, OutputFormat, PreviewArgs};
use crate::commands::common::{self, format_amount, print_table};

/// Execute the preview command
pub(crate) async fn execute(args: &PreviewArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::load_config(global)?;
    let store = common::load_store(&args.snapshot).await?;
    let root = LineItemId::parse(args.root.trim()).context("Invalid --root value")?;

    let estimate = find_estimate(&store, &root).await?;
    common::verbose(
        global,
        &format!("Line item '{}' belongs to estimate '{}'", root, estimate),
    );

    let snapshot = fetch_snapshot(&store, &estimate)
        .await
        .with_context(|| format!("Failed to fetch estimate '{}'", estimate))?;
    let branch = branch_items(&snapshot.line_items, &root)?;
    let evaluator = ExpressionEvaluator::new();
    let context = PreviewContext::from_snapshot(&snapshot, &branch, &config, &evaluator)?;
    let stats = preview_aggregate(&branch, &context, &evaluator)?;

    match args.output {
        OutputFormat::Json => common::print_json(&stats)?,
        OutputFormat::Table => {
            print_preview_table(&stats, &branch_names(&branch), config.display_decimals)
        }
    }
    Ok(())
}

/// The active estimate whose line items include `root`
async fn find_estimate(store: &MemoryStore, root: &LineItemId) -> Result<EstimateId> {
    for id in store.estimate_ids() {
        let items = store.line_items(&id).await?;
        if items.iter().any(|item| &item.id == root) {
            return Ok(id);
        }
    }
    bail!("Line item '{}' not found in any active estimate", root)
}

fn branch_names(branch: &[LineItem]) -> Vec<(LineItemId, String)> {
    branch
        .iter()
        .map(|item| (item.id.clone(), item.name.clone().unwrap_or_default()))
        .collect()
}

fn print_preview_table(stats: &SubtreeStats, names: &[(LineItemId, String)], decimals: u32) {
    let amount = |v: f64| format_amount(v, decimals);

    let rows: Vec<Vec<String>> = stats
        .nodes
        .iter()
        .map(|(id, node)| {
            let name = names
                .iter()
                .find(|(n, _)| n == id)
                .map(|(_, name)| name.clone())
                .unwrap_or_default();
            vec![
                id.to_string(),
                name,
                amount(node.own_quantity),
                amount(node.unit_cost),
                amount(node.own_cost),
                amount(node.subtree_cost),
            ]
        })
        .collect();
    print_table(
        &["LINE ITEM", "NAME", "QUANTITY", "UNIT COST", "COST", "SUBTREE"],
        &rows,
    );
    println!();

    let rows: Vec<Vec<String>> = stats
        .total_by_use_group
        .iter()
        .map(|(key, cost)| vec![key.to_string(), amount(*cost)])
        .collect();
    print_table(&["USE GROUP", "DIRECT"], &rows);
    println!();

    println!("Root:         {}", stats.root);
    println!("Subtree cost: {}", amount(stats.subtree_cost));
}
