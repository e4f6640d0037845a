//! minijinja-backed expression evaluator

use minijinja::value::Rest;
use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior, Value};
use rollup_core::{FormulaError, FormulaEvaluator, FormulaResult};
use std::collections::BTreeMap;

/// Evaluates quantity and markup formulas as minijinja expressions.
///
/// Undefined names are errors rather than silently empty, and the numeric
/// helpers `min`, `max`, `abs`, `ceil`, `floor` and `round` are available as
/// functions.
pub struct ExpressionEvaluator {
    env: Environment<'static>,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_function("min", min);
        env.add_function("max", max);
        env.add_function("abs", |x: f64| x.abs());
        env.add_function("ceil", |x: f64| x.ceil());
        env.add_function("floor", |x: f64| x.floor());
        env.add_function("round", round);
        Self { env }
    }
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn min(values: Rest<f64>) -> Result<f64, Error> {
    values
        .iter()
        .copied()
        .reduce(f64::min)
        .ok_or_else(|| Error::new(ErrorKind::MissingArgument, "min() needs at least one value"))
}

fn max(values: Rest<f64>) -> Result<f64, Error> {
    values
        .iter()
        .copied()
        .reduce(f64::max)
        .ok_or_else(|| Error::new(ErrorKind::MissingArgument, "max() needs at least one value"))
}

fn round(x: f64, places: Option<i32>) -> f64 {
    let factor = 10f64.powi(places.unwrap_or(0));
    (x * factor).round() / factor
}

fn to_number(formula: &str, value: Value) -> FormulaResult<f64> {
    let found = value.to_string();
    match f64::try_from(value) {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(FormulaError::NonNumeric {
            formula: formula.to_string(),
            found,
        }),
    }
}

impl ExpressionEvaluator {
    /// Alphabetically first name the expression reads that is neither bound
    /// in `variables` nor a registered function
    fn first_unbound(
        &self,
        expr: &minijinja::Expression<'_, '_>,
        variables: &BTreeMap<String, f64>,
    ) -> Option<String> {
        expr.undeclared_variables(false)
            .into_iter()
            .filter(|name| !variables.contains_key(name))
            .filter(|name| !self.env.globals().any(|(global, _)| global == name))
            .min()
    }
}

impl FormulaEvaluator for ExpressionEvaluator {
    fn evaluate(&self, formula: &str, variables: &BTreeMap<String, f64>) -> FormulaResult<f64> {
        let expr = self
            .env
            .compile_expression(formula)
            .map_err(|e| FormulaError::Invalid {
                formula: formula.to_string(),
                message: e.to_string(),
            })?;

        if let Some(name) = self.first_unbound(&expr, variables) {
            return Err(FormulaError::MissingVariable {
                formula: formula.to_string(),
                name,
            });
        }

        let value = expr.eval(Value::from_serialize(variables)).map_err(|e| {
            log::debug!("Formula '{}' failed: {}", formula, e);
            FormulaError::Invalid {
                formula: formula.to_string(),
                message: e.to_string(),
            }
        })?;

        to_number(formula, value)
    }
}

#[cfg(test)]
#[path = "expression_test.rs"]
mod tests;
