//! Pipeline configuration
//!
//! All tunables are explicit values passed to the orchestrator at
//! construction time. The configuration can be stored as TOML.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{NucmerError, NucmerResult};

/// Which query strands are aligned against the references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrandSelection {
    Forward,
    Reverse,
    Both,
}

impl StrandSelection {
    pub fn includes_forward(self) -> bool {
        matches!(self, StrandSelection::Forward | StrandSelection::Both)
    }

    pub fn includes_reverse(self) -> bool {
        matches!(self, StrandSelection::Reverse | StrandSelection::Both)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NucmerConfig {
    /// Minimum length of an exact match reported by the match finder
    #[serde(default = "default_length_of_mum")]
    pub length_of_mum: i64,

    /// How far an extension may run through a poorly scoring region before
    /// it gives up
    #[serde(default = "default_break_length")]
    pub break_length: i64,

    /// Diagonal difference always tolerated between clustered matches.
    /// Negative values keep the builder default.
    #[serde(default = "default_fixed_separation")]
    pub fixed_separation: i64,

    /// Largest query gap bridged inside one cluster. Negative values keep
    /// the builder default.
    #[serde(default = "default_maximum_separation")]
    pub maximum_separation: i64,

    /// Smallest reference span a cluster must cover. Negative values keep
    /// the builder default.
    #[serde(default = "default_minimum_score")]
    pub minimum_score: i64,

    /// Diagonal tolerance per residue of separation. Negative values keep
    /// the builder default.
    #[serde(default = "default_separation_factor")]
    pub separation_factor: f32,

    #[serde(default = "default_strand")]
    pub strand: StrandSelection,

    /// Value callers pass as `unique_in_reference` to `Nucmer::get_clusters`
    /// and `Nucmer::get_delta_alignments`
    #[serde(default = "default_true")]
    pub unique_in_reference: bool,

    /// Process queries on a rayon pool
    #[serde(default)]
    pub parallel: bool,

    /// Worker threads for the pool, 0 lets rayon decide
    #[serde(default)]
    pub threads: usize,

    #[serde(default)]
    pub extender: ExtenderConfig,
}

/// Scoring used by the built-in pairwise extender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtenderConfig {
    #[serde(default = "default_match_score")]
    pub match_score: i32,

    #[serde(default = "default_mismatch_score")]
    pub mismatch_score: i32,

    #[serde(default = "default_gap_score")]
    pub gap_score: i32,

    /// Extra diagonals kept on both sides of the band
    #[serde(default = "default_band_slack")]
    pub band_slack: usize,

    /// Dynamic programming budget before falling back to a plain path
    #[serde(default = "default_max_band_cells")]
    pub max_band_cells: usize,
}

fn default_length_of_mum() -> i64 { 20 }
fn default_break_length() -> i64 { 200 }
fn default_fixed_separation() -> i64 { 5 }
fn default_maximum_separation() -> i64 { 1000 }
fn default_minimum_score() -> i64 { 200 }
fn default_separation_factor() -> f32 { 0.05 }
fn default_strand() -> StrandSelection { StrandSelection::Forward }
fn default_true() -> bool { true }
fn default_match_score() -> i32 { 3 }
fn default_mismatch_score() -> i32 { -7 }
fn default_gap_score() -> i32 { -7 }
fn default_band_slack() -> usize { 32 }
fn default_max_band_cells() -> usize { 16_000_000 }

impl Default for ExtenderConfig {
    fn default() -> Self {
        Self {
            match_score: default_match_score(),
            mismatch_score: default_mismatch_score(),
            gap_score: default_gap_score(),
            band_slack: default_band_slack(),
            max_band_cells: default_max_band_cells(),
        }
    }
}

impl Default for NucmerConfig {
    fn default() -> Self {
        Self {
            length_of_mum: default_length_of_mum(),
            break_length: default_break_length(),
            fixed_separation: default_fixed_separation(),
            maximum_separation: default_maximum_separation(),
            minimum_score: default_minimum_score(),
            separation_factor: default_separation_factor(),
            strand: default_strand(),
            unique_in_reference: true,
            parallel: false,
            threads: 0,
            extender: ExtenderConfig::default(),
        }
    }
}

impl NucmerConfig {
    /// Check the values the pipeline cannot run with.
    pub fn validate(&self) -> NucmerResult<()> {
        if self.length_of_mum < 1 {
            return Err(NucmerError::invalid_configuration(format!(
                "length_of_mum must be at least 1, got {}",
                self.length_of_mum
            )));
        }
        if self.break_length < 1 {
            return Err(NucmerError::invalid_configuration(format!(
                "break_length must be at least 1, got {}",
                self.break_length
            )));
        }
        if self.extender.max_band_cells == 0 {
            return Err(NucmerError::invalid_configuration(
                "extender.max_band_cells must be positive",
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: NucmerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Default configuration rendered as TOML
    pub fn example_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).context("Failed to serialize default configuration")
    }
}
