//! Validate command implementation

use anyhow::{Context, Result};
use rollup_engine::{compute_stats, sort_reference_issues};
use rollup_formula::ExpressionEvaluator;
use rollup_store::fetch_snapshot;

use crate::cli::{GlobalArgs, ValidateArgs};
use crate::commands::common::{self, ExitCode};

/// Validation result severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single validation issue
struct ValidationIssue {
    severity: Severity,
    code: String,
    message: String,
    estimate: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}: {} (estimate '{}')",
            self.severity, self.code, self.message, self.estimate
        )
    }
}

/// Collect validation issues
struct ValidationContext {
    issues: Vec<ValidationIssue>,
}

impl ValidationContext {
    fn new() -> Self {
        Self { issues: Vec::new() }
    }

    fn push(&mut self, severity: Severity, estimate: &str, error: &dyn std::fmt::Display) {
        let (code, message) = split_code(&error.to_string());
        self.issues.push(ValidationIssue {
            severity,
            code,
            message,
            estimate: estimate.to_string(),
        });
    }

    fn error(&mut self, estimate: &str, error: &dyn std::fmt::Display) {
        self.push(Severity::Error, estimate, error);
    }

    fn warning(&mut self, estimate: &str, error: &dyn std::fmt::Display) {
        self.push(Severity::Warning, estimate, error);
    }

    fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    fn has_cycle(&self) -> bool {
        self.issues.iter().any(|i| {
            i.severity == Severity::Error && (i.code == "R001" || i.code == "R007")
        })
    }
}

/// Split a `[CODE] message` error string into its parts
fn split_code(text: &str) -> (String, String) {
    if let Some(rest) = text.strip_prefix('[') {
        if let Some((code, message)) = rest.split_once("] ") {
            return (code.to_string(), message.to_string());
        }
    }
    ("-".to_string(), text.to_string())
}

/// Execute the validate command
pub(crate) async fn execute(args: &ValidateArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::load_config(global)?;
    let store = common::load_store(&args.snapshot).await?;
    let evaluator = ExpressionEvaluator::new();
    let ids = store.estimate_ids();

    println!(
        "Validating {} estimate(s) in {}\n",
        ids.len(),
        args.snapshot.display()
    );

    let mut ctx = ValidationContext::new();
    for id in &ids {
        let snapshot = fetch_snapshot(&store, id)
            .await
            .with_context(|| format!("Failed to fetch estimate '{}'", id))?;

        for issue in sort_reference_issues(&snapshot) {
            ctx.warning(id.as_str(), &issue);
        }

        match compute_stats(&snapshot, &evaluator, &config) {
            Ok(stats) => common::verbose(
                global,
                &format!(
                    "Estimate '{}' ok: total {}",
                    id,
                    common::format_amount(stats.preview().total_cost, config.display_decimals)
                ),
            ),
            Err(err) => ctx.error(id.as_str(), &err),
        }
    }

    print_issues_and_summary(&ctx, args.strict)
}

/// Print all issues and the summary line
fn print_issues_and_summary(ctx: &ValidationContext, strict: bool) -> Result<()> {
    for issue in &ctx.issues {
        println!("{}", issue);
    }

    let error_count = ctx.error_count();
    let warning_count = ctx.warning_count();

    if !ctx.issues.is_empty() {
        println!();
    }
    if error_count == 0 && (warning_count == 0 || !strict) {
        println!(
            "Validation passed: {} errors, {} warnings",
            error_count, warning_count
        );
        Ok(())
    } else if error_count == 0 {
        println!(
            "Validation failed (strict mode): {} errors, {} warnings",
            error_count, warning_count
        );
        Err(ExitCode(1).into())
    } else {
        println!(
            "Validation failed: {} errors, {} warnings",
            error_count, warning_count
        );
        if ctx.has_cycle() {
            Err(ExitCode(3).into())
        } else {
            Err(ExitCode(1).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_code() {
        assert_eq!(
            split_code("[R001] Cyclic quantity dependency: a -> b"),
            ("R001".to_string(), "Cyclic quantity dependency: a -> b".to_string())
        );
        assert_eq!(
            split_code("no code here"),
            ("-".to_string(), "no code here".to_string())
        );
    }

    #[test]
    fn test_cycle_detection_only_counts_errors() {
        let mut ctx = ValidationContext::new();
        ctx.warning("e", &"[R001] not really");
        assert!(!ctx.has_cycle());
        ctx.error("e", &"[R007] Cyclic assembly: a -> b -> a");
        assert!(ctx.has_cycle());
        assert_eq!(ctx.error_count(), 1);
        assert_eq!(ctx.warning_count(), 1);
    }
}
