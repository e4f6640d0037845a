//! Per-run memoization of formula results

use rollup_core::{FormulaEvaluator, FormulaResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// (formula, variables as (name, f64 bits)) - bits so the key is `Eq + Hash`
type CacheKey = (String, Vec<(String, u64)>);

/// Wraps an evaluator and remembers successful results.
///
/// Create one per aggregation run; results are keyed on the exact formula
/// text and variable snapshot, so a stale entry can only be hit by identical
/// inputs. Failures are not cached.
pub struct CachingEvaluator<E> {
    inner: E,
    cache: Mutex<HashMap<CacheKey, f64>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<E: FormulaEvaluator> CachingEvaluator<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

fn cache_key(formula: &str, variables: &BTreeMap<String, f64>) -> CacheKey {
    (
        formula.to_string(),
        variables
            .iter()
            .map(|(name, value)| (name.clone(), value.to_bits()))
            .collect(),
    )
}

impl<E: FormulaEvaluator> FormulaEvaluator for CachingEvaluator<E> {
    fn evaluate(&self, formula: &str, variables: &BTreeMap<String, f64>) -> FormulaResult<f64> {
        let key = cache_key(formula, variables);
        {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(&value) = cache.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(value);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = self.inner.evaluate(formula, variables)?;
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, value);
        Ok(value)
    }
}
