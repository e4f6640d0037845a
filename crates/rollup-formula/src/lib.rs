//! rollup-formula - Formula evaluation for estimate rollup
//!
//! Provides [`ExpressionEvaluator`], a [`FormulaEvaluator`] backed by
//! minijinja expressions (`w * h * 1.1`, `max(a, b)`, `a if a > 0 else b`),
//! and [`CachingEvaluator`], which memoizes any evaluator per
//! (formula, variable snapshot) for the length of one aggregation run.
//!
//! [`FormulaEvaluator`]: rollup_core::FormulaEvaluator

pub mod cache;
pub mod expression;

pub use cache::CachingEvaluator;
pub use expression::ExpressionEvaluator;
