//! Formula collaborator interface
//!
//! The engine never parses expressions itself. It hands an expression and a
//! snapshot of named numbers to a [`FormulaEvaluator`] and gets a number back.

use crate::ids::LineItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A quantity expression plus the line items its names refer to.
///
/// Each key of `variables` is a name usable inside `expression`; the engine
/// binds it to the resolved quantity of the referenced line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityFormula {
    pub expression: String,

    #[serde(default)]
    pub variables: BTreeMap<String, LineItemId>,
}

impl QuantityFormula {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Bind `name` to another line item's quantity
    pub fn bind(mut self, name: impl Into<String>, line_item: LineItemId) -> Self {
        self.variables.insert(name.into(), line_item);
        self
    }

    /// Line items this formula depends on
    pub fn references(&self) -> impl Iterator<Item = &LineItemId> {
        self.variables.values()
    }
}

/// Formula evaluation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// F001: Expression could not be parsed or evaluated
    #[error("[F001] Invalid formula '{formula}': {message}")]
    Invalid { formula: String, message: String },

    /// F002: Expression uses a name with no bound value
    #[error("[F002] Formula '{formula}' references undefined variable '{name}'")]
    MissingVariable { formula: String, name: String },

    /// F003: Expression evaluated to something other than a finite number
    #[error("[F003] Formula '{formula}' did not produce a number (got {found})")]
    NonNumeric { formula: String, found: String },
}

/// Result type alias for FormulaError
pub type FormulaResult<T> = Result<T, FormulaError>;

/// Pluggable expression evaluation.
///
/// Implementations must be deterministic: the engine does not retry failures
/// and may call `evaluate` many times per run.
pub trait FormulaEvaluator: Send + Sync {
    fn evaluate(&self, formula: &str, variables: &BTreeMap<String, f64>) -> FormulaResult<f64>;
}

impl<T: FormulaEvaluator + ?Sized> FormulaEvaluator for &T {
    fn evaluate(&self, formula: &str, variables: &BTreeMap<String, f64>) -> FormulaResult<f64> {
        (**self).evaluate(formula, variables)
    }
}

impl<T: FormulaEvaluator + ?Sized> FormulaEvaluator for std::sync::Arc<T> {
    fn evaluate(&self, formula: &str, variables: &BTreeMap<String, f64>) -> FormulaResult<f64> {
        (**self).evaluate(formula, variables)
    }
}
