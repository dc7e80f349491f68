//! Pipeline configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration. After loading, `QUESTGRAPH_SEED` and `QUESTGRAPH_TOP_N`
//! override the analysis seed and ranking length.
//!
//! ```toml
//! min_quest_fields = 4
//! delimiter = "/"
//! mint_unresolved_endpoints = true
//!
//! [analysis]
//! seed = 42
//! top_n = 20
//!
//! [columns]
//! id = ["id", "entity_id", "ID", "Id"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::AnalysisConfig;
use crate::parser::ParseOptions;
use crate::resolve::ColumnCandidates;
use crate::{Error, Result};

pub const ENV_SEED: &str = "QUESTGRAPH_SEED";
pub const ENV_TOP_N: &str = "QUESTGRAPH_TOP_N";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Quest records with fewer fields are malformed.
    #[serde(default = "default_min_quest_fields")]
    pub min_quest_fields: usize,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Mint an entity for every unknown triplet endpoint before building.
    /// When off, such facts are dropped as unresolved.
    #[serde(default = "default_true")]
    pub mint_unresolved_endpoints: bool,

    /// Assert the built-in background facts.
    #[serde(default = "default_true")]
    pub static_knowledge: bool,

    /// Rows sampled by the relation-table validity check.
    #[serde(default = "default_relation_sample_size")]
    pub relation_sample_size: usize,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub columns: ColumnCandidates,
}

fn default_min_quest_fields() -> usize {
    4
}

fn default_delimiter() -> char {
    '/'
}

fn default_true() -> bool {
    true
}

fn default_relation_sample_size() -> usize {
    3
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_quest_fields: default_min_quest_fields(),
            delimiter: default_delimiter(),
            mint_unresolved_endpoints: true,
            static_knowledge: true,
            relation_sample_size: default_relation_sample_size(),
            analysis: AnalysisConfig::default(),
            columns: ColumnCandidates::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_env()?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Apply `QUESTGRAPH_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(ENV_SEED) {
            self.analysis.seed = raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{ENV_SEED} must be an unsigned integer, got {raw:?}")))?;
        }
        if let Some(raw) = lookup(ENV_TOP_N) {
            self.analysis.top_n = raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{ENV_TOP_N} must be an unsigned integer, got {raw:?}")))?;
        }
        self.validate()
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions { delimiter: self.delimiter, min_quest_fields: self.min_quest_fields }
    }

    fn validate(&self) -> Result<()> {
        if self.min_quest_fields == 0 {
            return Err(Error::Config("min_quest_fields must be at least 1".into()));
        }
        if !(self.analysis.resolution > 0.0) {
            return Err(Error::Config("analysis.resolution must be positive".into()));
        }
        if self.columns.id.is_empty() {
            return Err(Error::Config("columns.id must name at least one column".into()));
        }
        Ok(())
    }
}
