//! Configuration objects for scoring and layer rules.
//!
//! All tunables travel by parameter into the components that use them;
//! nothing here is global state.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One penalty term: a multiplier (or divisor, depending on the site) and a
/// cap the term never exceeds.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PenaltySpec {
    pub factor: f64,
    pub cap: f64,
}

impl PenaltySpec {
    pub const fn new(factor: f64, cap: f64) -> Self {
        Self { factor, cap }
    }
}

/// Scoring thresholds and penalty weights.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoreConfig {
    /// Average complexity above this starts costing points.
    #[serde(default = "default_complexity_target")]
    pub complexity_target: f64,
    /// Average element length (lines) above this starts costing points.
    #[serde(default = "default_length_target")]
    pub length_target: f64,
    /// Penalty per unit of excess average complexity (multiplier).
    #[serde(default = "default_complexity_penalty")]
    pub complexity_penalty: PenaltySpec,
    /// Penalty per unit of excess average length (divisor).
    #[serde(default = "default_length_penalty")]
    pub length_penalty: PenaltySpec,
    /// Penalty on the ratio of long elements (multiplier).
    #[serde(default = "default_long_ratio_penalty")]
    pub long_ratio_penalty: PenaltySpec,
    /// Penalty on the ratio of deeply nested elements (multiplier).
    #[serde(default = "default_nesting_ratio_penalty")]
    pub nesting_ratio_penalty: PenaltySpec,
    /// An element longer than this many lines is "long".
    #[serde(default = "default_long_element_lines")]
    pub long_element_lines: usize,
    /// An element nested deeper than this is "deep".
    #[serde(default = "default_deep_nesting_depth")]
    pub deep_nesting_depth: u32,
}

fn default_complexity_target() -> f64 {
    10.0
}

fn default_length_target() -> f64 {
    50.0
}

fn default_complexity_penalty() -> PenaltySpec {
    PenaltySpec::new(2.0, 30.0)
}

fn default_length_penalty() -> PenaltySpec {
    PenaltySpec::new(2.0, 25.0)
}

fn default_long_ratio_penalty() -> PenaltySpec {
    PenaltySpec::new(60.0, 40.0)
}

fn default_nesting_ratio_penalty() -> PenaltySpec {
    PenaltySpec::new(40.0, 30.0)
}

fn default_long_element_lines() -> usize {
    100
}

fn default_deep_nesting_depth() -> u32 {
    4
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            complexity_target: default_complexity_target(),
            length_target: default_length_target(),
            complexity_penalty: default_complexity_penalty(),
            length_penalty: default_length_penalty(),
            long_ratio_penalty: default_long_ratio_penalty(),
            nesting_ratio_penalty: default_nesting_ratio_penalty(),
            long_element_lines: default_long_element_lines(),
            deep_nesting_depth: default_deep_nesting_depth(),
        }
    }
}

impl ScoreConfig {
    /// Parse a scoring config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: ScoreConfig = serde_yaml::from_str(&content)?;
        validate_score_config(&config)?;
        Ok(config)
    }
}

/// Validate a scoring config for correctness.
pub fn validate_score_config(config: &ScoreConfig) -> anyhow::Result<()> {
    for (name, spec) in [
        ("complexity_penalty", config.complexity_penalty),
        ("length_penalty", config.length_penalty),
        ("long_ratio_penalty", config.long_ratio_penalty),
        ("nesting_ratio_penalty", config.nesting_ratio_penalty),
    ] {
        if spec.factor <= 0.0 {
            anyhow::bail!("{} factor must be positive, got {}", name, spec.factor);
        }
        if spec.cap < 0.0 {
            anyhow::bail!("{} cap must be non-negative, got {}", name, spec.cap);
        }
    }
    if config.long_element_lines == 0 {
        anyhow::bail!("long_element_lines must be positive");
    }
    Ok(())
}

/// Maps files to architectural layers by path prefix.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LayerRule {
    pub name: String,
    pub prefixes: Vec<String>,
}

/// Layer-violation rules.
///
/// When `allow` is absent the check is inert and reports nothing. An empty
/// per-layer allow-list is different: it permits no outgoing imports at all.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub layers: Vec<LayerRule>,
    #[serde(default)]
    pub allow: Option<BTreeMap<String, Vec<String>>>,
}

impl LayerConfig {
    /// Parse a layer config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: LayerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// The layer a file belongs to, by longest matching prefix.
    pub fn layer_of(&self, file: &str) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for rule in &self.layers {
            for prefix in &rule.prefixes {
                if file.starts_with(prefix.as_str()) {
                    let len = prefix.len();
                    if best.map(|(_, l)| len > l).unwrap_or(true) {
                        best = Some((rule.name.as_str(), len));
                    }
                }
            }
        }
        best.map(|(name, _)| name)
    }
}
