use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::utils::{validate_contamination, AnalysisError};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub forest: ForestConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub comps: CompsConfig,
}

/// Isolation forest parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ForestConfig {
    #[serde(default = "default_tree_count", alias = "treeCount")]
    pub tree_count: usize,
    /// Upper bound on the per-tree sample; the effective size is `min(subsample_size, N)`
    #[serde(default = "default_subsample_size", alias = "subsampleSize")]
    pub subsample_size: usize,
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    #[serde(default = "default_random_seed", alias = "randomSeed")]
    pub random_seed: u64,
}

/// Validity filters applied when building feature records
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FilterConfig {
    /// Exclusive lower price bound
    #[serde(default = "default_min_price")]
    pub min_price: f64,
    /// Inclusive upper price bound
    #[serde(default = "default_max_price")]
    pub max_price: f64,
    #[serde(default = "default_max_area")]
    pub max_area: f64,
    /// Smallest working set a forest is built for
    #[serde(default = "default_min_records")]
    pub min_records: usize,
    #[serde(default = "default_year_built")]
    pub default_year_built: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CompsConfig {
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
    #[serde(default = "default_min_sold")]
    pub min_sold: usize,
    #[serde(default = "default_deal_threshold_pct")]
    pub deal_threshold_pct: f64,
    #[serde(default = "default_overpriced_threshold_pct")]
    pub overpriced_threshold_pct: f64,
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
        let config: EngineConfig =
            toml::from_str(&content).context("Failed to parse config TOML")?;
        Ok(config)
    }

    /// Load from a path if one is given, otherwise use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.forest.tree_count == 0 {
            return Err(AnalysisError::ValidationError(
                "tree_count must be > 0".to_string(),
            ));
        }
        if self.forest.subsample_size < 2 {
            return Err(AnalysisError::ValidationError(format!(
                "subsample_size must be >= 2, got {}",
                self.forest.subsample_size
            )));
        }
        validate_contamination(self.forest.contamination)?;
        if self.filters.min_records < 2 {
            return Err(AnalysisError::ValidationError(format!(
                "min_records must be >= 2, got {}",
                self.filters.min_records
            )));
        }
        if self.filters.min_price >= self.filters.max_price {
            return Err(AnalysisError::ValidationError(format!(
                "min_price ({}) must be below max_price ({})",
                self.filters.min_price, self.filters.max_price
            )));
        }
        if self.comps.neighbors == 0 {
            return Err(AnalysisError::ValidationError(
                "neighbors must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            tree_count: default_tree_count(),
            subsample_size: default_subsample_size(),
            contamination: default_contamination(),
            random_seed: default_random_seed(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_price: default_min_price(),
            max_price: default_max_price(),
            max_area: default_max_area(),
            min_records: default_min_records(),
            default_year_built: default_year_built(),
        }
    }
}

impl Default for CompsConfig {
    fn default() -> Self {
        Self {
            neighbors: default_neighbors(),
            min_sold: default_min_sold(),
            deal_threshold_pct: default_deal_threshold_pct(),
            overpriced_threshold_pct: default_overpriced_threshold_pct(),
        }
    }
}

fn default_tree_count() -> usize {
    100
}

fn default_subsample_size() -> usize {
    256
}

fn default_contamination() -> f64 {
    0.10
}

fn default_random_seed() -> u64 {
    42
}

fn default_min_price() -> f64 {
    50_000.0
}

fn default_max_price() -> f64 {
    5_000_000.0
}

fn default_max_area() -> f64 {
    10_000.0
}

fn default_min_records() -> usize {
    10
}

fn default_year_built() -> f64 {
    1970.0
}

fn default_neighbors() -> usize {
    5
}

fn default_min_sold() -> usize {
    10
}

fn default_deal_threshold_pct() -> f64 {
    -10.0
}

fn default_overpriced_threshold_pct() -> f64 {
    20.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.forest.tree_count, 100);
        assert_eq!(config.forest.subsample_size, 256);
        assert_eq!(config.forest.contamination, 0.10);
        assert_eq!(config.filters.min_records, 10);
        assert_eq!(config.comps.neighbors, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_section() {
        let toml_str = r#"
[forest]
tree_count = 50
random_seed = 7
[filters]
max_area = 8000.0
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.forest.tree_count, 50);
        assert_eq!(config.forest.random_seed, 7);
        assert_eq!(config.forest.subsample_size, 256);
        assert_eq!(config.filters.max_area, 8000.0);
        assert_eq!(config.filters.min_price, 50_000.0);
    }

    #[test]
    fn test_config_camel_case_aliases() {
        let toml_str = r#"
[forest]
treeCount = 25
subsampleSize = 64
randomSeed = 3
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.forest.tree_count, 25);
        assert_eq!(config.forest.subsample_size, 64);
        assert_eq!(config.forest.random_seed, 3);
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[forest]\ncontamination = 0.05").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.forest.contamination, 0.05);

        let missing = EngineConfig::load("/nonexistent/engine.toml");
        assert!(missing.is_err());
    }

    #[test]
    fn test_config_validate_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.forest.tree_count = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.forest.subsample_size = 1;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.forest.contamination = 0.9;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.filters.min_price = 6_000_000.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.comps.neighbors = 0;
        assert!(config.validate().is_err());
    }
}
