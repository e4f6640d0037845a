//! Aggregate command implementation

use anyhow::Result;
use rollup_core::{EstimateStats, RollupConfig};
use rollup_engine::Aggregator;
use rollup_formula::ExpressionEvaluator;

use crate::cli::{AggregateArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{self, format_amount, print_table, ExitCode};

/// Execute the aggregate command
pub(crate) async fn execute(args: &AggregateArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::load_config(global)?;
    let store = common::load_store(&args.snapshot).await?;
    let ids = common::select_estimates(&store, &args.estimates)?;
    common::verbose(global, &format!("Aggregating {} estimate(s)", ids.len()));

    let aggregator = Aggregator::new(store, ExpressionEvaluator::new(), config);
    let results = aggregator.aggregate_many(&ids).await;

    let mut computed: Vec<(EstimateStats, bool)> = Vec::with_capacity(results.len());
    let mut failures = 0;
    for (id, result) in results {
        let outcome = result.and_then(|stats| {
            if args.commit {
                stats.into_committable().map(|s| (s, false))
            } else {
                let locked = stats.is_locked();
                Ok((stats.into_preview(), locked))
            }
        });
        match outcome {
            Ok(entry) => computed.push(entry),
            Err(err) => {
                failures += 1;
                eprintln!("Estimate '{}' failed: {}", id, err);
            }
        }
    }

    match args.output {
        OutputFormat::Json => {
            let stats: Vec<&EstimateStats> = computed.iter().map(|(s, _)| s).collect();
            common::print_json(&stats)?;
        }
        OutputFormat::Table => {
            for (stats, locked) in &computed {
                print_stats_table(stats, *locked, aggregator.config());
            }
        }
    }

    if failures > 0 {
        eprintln!(
            "{} of {} estimate(s) failed to aggregate",
            failures,
            computed.len() + failures
        );
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn print_stats_table(stats: &EstimateStats, locked: bool, config: &RollupConfig) {
    let decimals = config.display_decimals;
    let amount = |v: f64| format_amount(v, decimals);

    println!("Estimate: {}", stats.estimate_id);
    if locked {
        println!("(locked: preview only, not committable)");
    }
    println!();

    let rows: Vec<Vec<String>> = stats
        .use_groups
        .iter()
        .map(|ug| {
            vec![
                ug.label.clone().unwrap_or_else(|| ug.key.to_string()),
                amount(ug.direct_cost),
                amount(ug.marked_up_cost),
                if ug.exclude_area { "yes" } else { "" }.to_string(),
            ]
        })
        .collect();
    print_table(&["USE GROUP", "DIRECT", "MARKED UP", "EXCL. AREA"], &rows);
    println!();

    if !stats.total_by_markup.is_empty() {
        let rows: Vec<Vec<String>> = stats
            .total_by_markup
            .iter()
            .map(|m| {
                vec![
                    m.description
                        .clone()
                        .unwrap_or_else(|| m.markup_id.to_string()),
                    format!("{:?}", m.kind).to_lowercase(),
                    amount(m.base),
                    amount(m.amount),
                    amount(m.running_total),
                ]
            })
            .collect();
        print_table(&["MARKUP", "KIND", "BASE", "AMOUNT", "RUNNING"], &rows);
        println!();
    }

    println!("Line items: {}", stats.line_item_count);
    println!("Subtotal:   {}", amount(stats.subtotal));
    println!("Total:      {}", amount(stats.total_cost));
    for (alternate, cost) in &stats.total_by_alternate {
        println!("Alternate {}: {}", alternate, amount(*cost));
    }
    println!();
}
