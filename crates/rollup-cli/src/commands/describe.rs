//! Describe command implementation

use anyhow::{Context, Result};
use rollup_core::StaticClassificationLookup;
use rollup_engine::{describe_classification, Aggregator, ClassificationRow};
use rollup_formula::ExpressionEvaluator;
use std::collections::BTreeMap;

use crate::cli::{DescribeArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{self, format_amount, print_table, ExitCode};

/// Execute the describe command
pub(crate) async fn execute(args: &DescribeArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::load_config(global)?;
    let lookup = match &args.codes {
        Some(path) => {
            let lookup = StaticClassificationLookup::load(path).with_context(|| {
                format!("Failed to load classification codes from {}", path.display())
            })?;
            common::verbose(
                global,
                &format!("Loaded {} classification codes", lookup.len()),
            );
            lookup
        }
        None => StaticClassificationLookup::new(),
    };

    let store = common::load_store(&args.snapshot).await?;
    let ids = common::select_estimates(&store, &args.estimates)?;
    let decimals = config.display_decimals;
    let aggregator = Aggregator::new(store, ExpressionEvaluator::new(), config);

    let mut reports: BTreeMap<String, Vec<ClassificationRow>> = BTreeMap::new();
    let mut failures = 0;
    for (id, result) in aggregator.aggregate_many(&ids).await {
        match result {
            Ok(stats) => {
                let rows = describe_classification(
                    &stats.preview().total_by_classification,
                    &lookup,
                );
                reports.insert(id.to_string(), rows);
            }
            Err(err) => {
                failures += 1;
                eprintln!("Estimate '{}' failed: {}", id, err);
            }
        }
    }

    match args.output {
        OutputFormat::Json => common::print_json(&reports)?,
        OutputFormat::Table => {
            for (estimate, rows) in &reports {
                println!("Estimate: {}\n", estimate);
                let rows: Vec<Vec<String>> = rows
                    .iter()
                    .map(|row| {
                        vec![
                            row.scheme.to_string(),
                            row.level.to_string(),
                            row.code.clone(),
                            row.description.clone().unwrap_or_else(|| "-".to_string()),
                            format_amount(row.cost, decimals),
                        ]
                    })
                    .collect();
                print_table(&["SCHEME", "LEVEL", "CODE", "DESCRIPTION", "COST"], &rows);
                println!();
            }
        }
    }

    if failures > 0 {
        return Err(ExitCode(1).into());
    }
    Ok(())
}
