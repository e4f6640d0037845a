//! Rollup configuration (`rollup.yml`)

use crate::error::{CoreError, CoreResult};
use crate::serde_helpers::default_true;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RollupConfig {
    /// Slack when comparing a line item's use-group percentages to 100
    #[serde(default = "default_allocation_tolerance")]
    pub allocation_tolerance: f64,

    /// Which classification levels feed the breakdown
    #[serde(default)]
    pub classification_depth: ClassificationDepth,

    /// Memoize formula results for the duration of one run
    #[serde(default = "default_true")]
    pub cache_formulas: bool,

    /// Decimal places used when rendering tables
    #[serde(default = "default_display_decimals")]
    pub display_decimals: u32,

    /// Names exposed to markup formulas
    #[serde(default)]
    pub formula_variables: FormulaVariableConfig,
}

/// Classification breakdown depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationDepth {
    /// Every level a line item carries
    #[default]
    All,
    /// Only the deepest level each line item carries
    Deepest,
}

/// Variable names bound when evaluating markup formulas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormulaVariableConfig {
    /// The markup's base (the in-scope running subtotal)
    #[serde(default = "default_subtotal_name")]
    pub subtotal_name: String,

    /// The whole running subtotal regardless of scope
    #[serde(default = "default_total_name")]
    pub total_name: String,

    /// Prefix for per-use-group running subtotals
    #[serde(default = "default_use_group_prefix")]
    pub use_group_prefix: String,
}

impl Default for FormulaVariableConfig {
    fn default() -> Self {
        Self {
            subtotal_name: default_subtotal_name(),
            total_name: default_total_name(),
            use_group_prefix: default_use_group_prefix(),
        }
    }
}

impl FormulaVariableConfig {
    /// Variable name for a use group: prefix + lower-cased label with runs of
    /// non-alphanumerics collapsed to `_` (`Core & Shell` → `ug_core_shell`).
    pub fn use_group_variable(&self, label: &str) -> String {
        let mut slug = String::with_capacity(label.len());
        for c in label.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('_') {
                slug.push('_');
            }
        }
        let slug = slug.trim_end_matches('_');
        format!("{}{}", self.use_group_prefix, slug)
    }
}

fn default_allocation_tolerance() -> f64 {
    1e-9
}

fn default_display_decimals() -> u32 {
    2
}

fn default_subtotal_name() -> String {
    "subtotal".to_string()
}

fn default_total_name() -> String {
    "running_total".to_string()
}

fn default_use_group_prefix() -> String {
    "ug_".to_string()
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            allocation_tolerance: default_allocation_tolerance(),
            classification_depth: ClassificationDepth::default(),
            cache_formulas: true,
            display_decimals: default_display_decimals(),
            formula_variables: FormulaVariableConfig::default(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl RollupConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load from `path` when given, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> CoreResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> CoreResult<Self> {
        let config: RollupConfig = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if !self.allocation_tolerance.is_finite() || self.allocation_tolerance < 0.0 {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "allocation_tolerance must be a non-negative number, got {}",
                    self.allocation_tolerance
                ),
            });
        }

        if self.display_decimals > 10 {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "display_decimals must be at most 10, got {}",
                    self.display_decimals
                ),
            });
        }

        let vars = &self.formula_variables;
        for name in [&vars.subtotal_name, &vars.total_name] {
            if !is_identifier(name) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("formula variable '{}' is not a valid identifier", name),
                });
            }
        }
        if vars.subtotal_name == vars.total_name {
            return Err(CoreError::ConfigInvalid {
                message: "formula_variables.subtotal_name and total_name must differ".to_string(),
            });
        }
        if !is_identifier(&format!("{}x", vars.use_group_prefix)) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "use_group_prefix '{}' cannot start an identifier",
                    vars.use_group_prefix
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
