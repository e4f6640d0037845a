//! MasterFormat / UniFormat classification codes
//!
//! Line items and products carry hierarchical codes per scheme, exported as
//! `{"mf1": "03 00 00", "mf2": "03 30 00", "mf3": "03 30 10"}`. They are held
//! here as a level → code map. Descriptions come from a
//! [`ClassificationLookup`] and are display-only.

use crate::error::{CoreError, CoreResult};
use serde::de;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Classification scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationScheme {
    /// MasterFormat
    Mf,
    /// UniFormat
    Uf,
}

impl ClassificationScheme {
    /// Both schemes, in report order
    pub const ALL: [ClassificationScheme; 2] = [ClassificationScheme::Mf, ClassificationScheme::Uf];

    /// Key prefix used in exports (`mf1`, `uf2`, ...)
    pub fn prefix(&self) -> &'static str {
        match self {
            ClassificationScheme::Mf => "mf",
            ClassificationScheme::Uf => "uf",
        }
    }
}

impl fmt::Display for ClassificationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Codes for one scheme, keyed by hierarchy level (1 = broadest)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationCodes {
    levels: BTreeMap<u8, String>,
}

impl ClassificationCodes {
    /// Build from `(level, code)` pairs
    pub fn from_levels<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = (u8, S)>,
        S: Into<String>,
    {
        Self {
            levels: levels
                .into_iter()
                .map(|(level, code)| (level, code.into()))
                .filter(|(_, code)| !code.is_empty())
                .collect(),
        }
    }

    /// Code at a level, if present
    pub fn get(&self, level: u8) -> Option<&str> {
        self.levels.get(&level).map(String::as_str)
    }

    /// All `(level, code)` pairs, broadest first
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.levels.iter().map(|(level, code)| (*level, code.as_str()))
    }

    /// The deepest level present
    pub fn deepest(&self) -> Option<(u8, &str)> {
        self.levels
            .iter()
            .next_back()
            .map(|(level, code)| (*level, code.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Extract the numeric level from an export key such as `mf3`.
fn parse_level(key: &str) -> Option<u8> {
    let digits: String = key.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

impl<'de> Deserialize<'de> for ClassificationCodes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<BTreeMap<String, Option<String>>>::deserialize(deserializer)?;
        let mut levels = BTreeMap::new();
        for (key, code) in raw.unwrap_or_default() {
            let level = parse_level(&key).ok_or_else(|| {
                de::Error::custom(format!("classification key '{}' has no level number", key))
            })?;
            if let Some(code) = code.filter(|c| !c.is_empty()) {
                levels.insert(level, code);
            }
        }
        Ok(Self { levels })
    }
}

impl Serialize for ClassificationCodes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.levels.len()))?;
        for (level, code) in &self.levels {
            map.serialize_entry(&level.to_string(), code)?;
        }
        map.end()
    }
}

/// Resolves classification codes to human-readable descriptions
pub trait ClassificationLookup: Send + Sync {
    /// Description for a code, if known
    fn describe(&self, scheme: ClassificationScheme, code: &str) -> Option<String>;
}

/// One node of a classification hierarchy as configured in the app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationNode {
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub children: Vec<ClassificationNode>,
}

/// Lookup backed by in-memory code tables
#[derive(Debug, Clone, Default)]
pub struct StaticClassificationLookup {
    codes: BTreeMap<ClassificationScheme, BTreeMap<String, String>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CodeFile {
    #[serde(default)]
    mf: Vec<ClassificationNode>,
    #[serde(default)]
    uf: Vec<ClassificationNode>,
}

impl StaticClassificationLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single description
    pub fn insert(
        &mut self,
        scheme: ClassificationScheme,
        code: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.codes
            .entry(scheme)
            .or_default()
            .insert(code.into(), description.into());
    }

    /// Register every node of a hierarchy
    pub fn insert_tree(&mut self, scheme: ClassificationScheme, nodes: &[ClassificationNode]) {
        for node in nodes {
            self.insert(scheme, node.code.clone(), node.description.clone());
            self.insert_tree(scheme, &node.children);
        }
    }

    /// Parse a YAML code file with `mf:` and `uf:` hierarchies
    pub fn from_yaml_str(yaml: &str) -> CoreResult<Self> {
        let file: CodeFile = serde_yaml::from_str(yaml)?;
        let mut lookup = Self::new();
        lookup.insert_tree(ClassificationScheme::Mf, &file.mf);
        lookup.insert_tree(ClassificationScheme::Uf, &file.uf);
        Ok(lookup)
    }

    /// Load a YAML code file from disk
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Number of registered codes across both schemes
    pub fn len(&self) -> usize {
        self.codes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClassificationLookup for StaticClassificationLookup {
    fn describe(&self, scheme: ClassificationScheme, code: &str) -> Option<String> {
        self.codes.get(&scheme)?.get(code).cloned()
    }
}

#[cfg(test)]
#[path = "classification_test.rs"]
mod tests;
