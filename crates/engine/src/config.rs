use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::dedupe::KeepPolicy;
use crate::error::MergeError;
use crate::load::{DType, LoadOptions};
use crate::merge::{Cardinality, JoinType, MergeOptions};
use crate::normalize::NormalizeOptions;
use crate::resolve::{ConflictRule, ConflictStrategy};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Declarative description of one merge job, usually loaded from TOML.
///
/// Strategy and join tokens are closed enums, so a typo fails at
/// deserialization instead of somewhere inside the merge.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub name: String,
    pub left: SideConfig,
    pub right: SideConfig,
    pub merge: MergeConfig,
    /// Base column name to resolution strategy.
    #[serde(default)]
    pub conflicts: BTreeMap<String, ConflictStrategy>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SideConfig {
    pub file: String,
    /// Field delimiter; sniffed from the file when absent.
    #[serde(default)]
    pub delimiter: Option<char>,
    /// Renames applied to original (pre-normalization) header names.
    #[serde(default)]
    pub rename: HashMap<String, String>,
    #[serde(default)]
    pub dtypes: BTreeMap<String, DType>,
    #[serde(default)]
    pub parse_dates: Vec<String>,
    #[serde(default)]
    pub dedupe: Option<DedupeConfig>,
}

impl SideConfig {
    /// Loader options for this side.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.delimiter.map(|c| c as u8),
            rename: self.rename.clone(),
            normalize: NormalizeOptions::default(),
            dtypes: self.dtypes.clone(),
            parse_dates: self.parse_dates.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedupeConfig {
    pub keys: Vec<String>,
    #[serde(default)]
    pub keep: KeepPolicy,
}

// ---------------------------------------------------------------------------
// Merge + output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    pub keys: Vec<String>,
    #[serde(default = "default_how")]
    pub how: JoinType,
    #[serde(default)]
    pub validate: Option<Cardinality>,
    #[serde(default = "default_suffixes")]
    pub suffixes: (String, String),
}

fn default_how() -> JoinType {
    JoinType::Inner
}

fn default_suffixes() -> (String, String) {
    ("_left".to_string(), "_right".to_string())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Where to write the merged CSV.
    #[serde(default)]
    pub file: Option<String>,
    /// Where to write the plain-text audit report.
    #[serde(default)]
    pub report: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + validate
// ---------------------------------------------------------------------------

impl JobConfig {
    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let config: JobConfig =
            toml::from_str(input).map_err(|e| MergeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.merge.keys.is_empty() {
            return Err(MergeError::EmptyJoinKeys);
        }
        let (l, r) = &self.merge.suffixes;
        if l == r {
            return Err(MergeError::ConfigValidation(format!(
                "suffixes must differ, got '{l}' twice"
            )));
        }
        for (side_name, side) in [("left", &self.left), ("right", &self.right)] {
            if let Some(c) = side.delimiter {
                if !c.is_ascii() {
                    return Err(MergeError::ConfigValidation(format!(
                        "{side_name} delimiter must be a single ASCII character"
                    )));
                }
            }
            if let Some(dedupe) = &side.dedupe {
                if dedupe.keys.is_empty() {
                    return Err(MergeError::ConfigValidation(format!(
                        "{side_name} dedupe keys must not be empty"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Join options from the `[merge]` section. The pipeline always
    /// requests the indicator; auditing needs it.
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            keys: self.merge.keys.clone(),
            how: self.merge.how,
            validate: self.merge.validate,
            suffixes: self.merge.suffixes.clone(),
            indicator: true,
        }
    }

    pub fn conflict_rules(&self) -> Vec<ConflictRule> {
        self.conflicts
            .iter()
            .map(|(column, strategy)| ConflictRule {
                column: column.clone(),
                strategy: *strategy,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
