//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use rollup_core::{EstimateId, RollupConfig};
use rollup_store::MemoryStore;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "rollup.yml";

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command has already reported the failure
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Print verbose output if enabled
pub(crate) fn verbose(global: &GlobalArgs, msg: &str) {
    if global.verbose {
        eprintln!("[verbose] {}", msg);
    }
}

/// Load the rollup config from `--config`, `./rollup.yml`, or defaults
pub(crate) fn load_config(global: &GlobalArgs) -> Result<RollupConfig> {
    let path = match &global.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };
    let config = RollupConfig::load_or_default(path.as_deref())
        .context("Failed to load rollup configuration")?;
    match &path {
        Some(path) => verbose(global, &format!("Loaded config from {}", path.display())),
        None => verbose(global, "Using default config"),
    }
    Ok(config)
}

/// Load a record file into an in-memory store
pub(crate) async fn load_store(path: &Path) -> Result<MemoryStore> {
    let store = MemoryStore::load(path)
        .await
        .with_context(|| format!("Failed to load records from {}", path.display()))?;
    log::debug!(
        "Loaded {} active estimate(s) from {}",
        store.estimate_ids().len(),
        path.display()
    );
    Ok(store)
}

/// Requested estimate ids, or every active estimate in the store
pub(crate) fn select_estimates(
    store: &MemoryStore,
    requested: &[String],
) -> Result<Vec<EstimateId>> {
    if requested.is_empty() {
        return Ok(store.estimate_ids());
    }
    requested
        .iter()
        .map(|id| EstimateId::parse(id.trim()))
        .collect::<Result<_, _>>()
        .context("Invalid --estimate value")
}

/// Round for display. Values that round to zero print without a sign.
pub(crate) fn format_amount(value: f64, decimals: u32) -> String {
    let half_unit = 0.5 * 10f64.powi(-(decimals as i32));
    let value = if value.abs() < half_unit { 0.0 } else { value };
    format!("{:.*}", decimals as usize, value)
}

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Print rows as an aligned table with a header and separator
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(String::len)
                .max()
                .unwrap_or(0)
                .max(header.len())
        })
        .collect();

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", line(headers.iter().map(|h| h.to_string()).collect()));
    println!("{}", line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        println!("{}", line(row.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_rounds_to_decimals() {
        assert_eq!(format_amount(693.0, 2), "693.00");
        assert_eq!(format_amount(92.4000000001, 2), "92.40");
        assert_eq!(format_amount(1.5, 0), "2");
    }

    #[test]
    fn test_format_amount_drops_negative_zero() {
        assert_eq!(format_amount(-1e-12, 2), "0.00");
        assert_eq!(format_amount(-0.004, 2), "0.00");
        assert_eq!(format_amount(-0.006, 2), "-0.01");
    }

    #[test]
    fn test_select_estimates_defaults_to_all_active() {
        let tables = rollup_store::RecordTables::parse(
            r#"{"estimates": [
                {"id": "a", "project": "p"},
                {"id": "b", "project": "p", "deleted_at": "2024-01-01T00:00:00Z"}
            ]}"#,
            false,
            "inline",
        )
        .unwrap();
        let store = MemoryStore::from_tables(tables).unwrap();

        let all = select_estimates(&store, &[]).unwrap();
        assert_eq!(all, vec![EstimateId::new("a")]);

        let picked = select_estimates(&store, &["b".to_string()]).unwrap();
        assert_eq!(picked, vec![EstimateId::new("b")]);

        assert!(select_estimates(&store, &["  ".to_string()]).is_err());
    }
}
