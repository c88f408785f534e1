use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::deal::{classify_deals, DealScore};
use super::feature::{validate_features, FEATURE_NAMES};
use super::forest::{Forest, ForestOptions};
use crate::config::ForestConfig;
use crate::utils::{standard_scale, validate_contamination, AnalysisError, StandardScaler};

/// Frozen scaling statistics plus the forest trained on the scaled rows
#[derive(Debug, Clone)]
pub struct AnomalyModel {
    scaler: StandardScaler,
    forest: Forest,
}

impl AnomalyModel {
    /// Standardize `features` and build a forest over them
    pub fn fit(features: &Array2<f64>, config: &ForestConfig) -> Result<Self, AnalysisError> {
        validate_features(features)?;

        let (scaler, scaled) = standard_scale(features)?;
        for col in scaler.constant_columns() {
            let name = FEATURE_NAMES.get(col).copied().unwrap_or("feature");
            warn!(column = col, name, "Feature has zero variance, scaled to 0");
        }

        let options = ForestOptions {
            n_trees: config.tree_count,
            sample_size: config.subsample_size,
        };
        let mut rng = StdRng::seed_from_u64(config.random_seed);
        let forest = Forest::build(&scaled, &options, &mut rng)?;

        Ok(Self { scaler, forest })
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Anomaly score of one unscaled feature row
    pub fn score(&self, row: ArrayView1<f64>) -> Result<f64, AnalysisError> {
        let scaled = self.scaler.transform_row(row)?;
        Ok(self.forest.score(scaled.view()))
    }

    /// Anomaly scores of every unscaled feature row
    pub fn score_batch(&self, features: &Array2<f64>) -> Result<Vec<f64>, AnalysisError> {
        let scaled = self.scaler.transform(features)?;
        self.forest.score_batch(&scaled)
    }
}

/// Anomaly scores and deal classification for a batch
#[derive(Debug, Clone)]
pub struct AnomalyResult {
    /// Per-row anomaly score in (0, 1)
    pub scores: Vec<f64>,
    /// Per-row deal score and flag, relative to this batch
    pub deals: Vec<DealScore>,
}

/// Run isolation forest anomaly detection over a feature matrix
///
/// # Arguments
/// * `features` - Unscaled feature matrix (rows=samples, cols=features)
/// * `config` - Tree count, sub-sample size, contamination and seed
///
/// # Returns
/// * `Ok(AnomalyResult)` - Anomaly scores plus batch-relative deal scores
/// * `Err(AnalysisError)` - If validation or training fails
///
/// # Algorithm
/// Features are standardized once, `tree_count` isolation trees are built on
/// independent sub-samples and every row is scored against the finished
/// forest. Deal scores come from min-max rescaling across this batch.
pub fn run_isolation_forest(
    features: &Array2<f64>,
    config: &ForestConfig,
) -> Result<AnomalyResult, AnalysisError> {
    validate_contamination(config.contamination)?;

    let model = AnomalyModel::fit(features, config)?;
    info!(
        trees = model.forest().n_trees(),
        sample_size = model.forest().sample_size(),
        "Isolation forest built"
    );

    let scores = model.score_batch(features)?;

    let score_min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let score_max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let score_avg = scores.iter().sum::<f64>() / scores.len() as f64;
    debug!(
        "Score range: [{:.6}, {:.6}], avg: {:.6}",
        score_min, score_max, score_avg
    );

    let deals = classify_deals(&scores, config.contamination)?;

    Ok(AnomalyResult { scores, deals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn small_config() -> ForestConfig {
        ForestConfig {
            tree_count: 50,
            subsample_size: 256,
            contamination: 0.25,
            random_seed: 42,
        }
    }

    #[test]
    fn test_run_isolation_forest_normal() {
        let features = arr2(&[
            [1.0, 2.0],
            [2.0, 3.0],
            [3.0, 4.0],
            [2.5, 3.5],
            [1.5, 2.5],
            [2.0, 2.0],
            [3.0, 3.0],
            [100.0, 200.0],
        ]);
        let result = run_isolation_forest(&features, &small_config()).unwrap();

        assert_eq!(result.scores.len(), 8);
        assert_eq!(result.deals.len(), 8);

        // Last point (100, 200) should be most anomalous
        let max_idx = result
            .scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(max_idx, 7);
        assert_eq!(result.deals[7].deal_score, 100);
        assert!(result.deals[7].is_anomaly);
        assert_eq!(result.deals.iter().filter(|d| d.is_anomaly).count(), 2);
    }

    #[test]
    fn test_run_isolation_forest_invalid_contamination() {
        let features = arr2(&[[1.0, 2.0], [2.0, 3.0]]);
        let mut config = small_config();
        config.contamination = 1.5;
        assert!(run_isolation_forest(&features, &config).is_err());
    }

    #[test]
    fn test_run_isolation_forest_empty() {
        let features = Array2::<f64>::zeros((0, 2));
        assert!(run_isolation_forest(&features, &small_config()).is_err());
    }

    #[test]
    fn test_run_isolation_forest_identical_rows() {
        let features = arr2(&[[1.0, 1.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]);
        let result = run_isolation_forest(&features, &small_config()).unwrap();
        assert!(result
            .deals
            .iter()
            .all(|d| d.deal_score == 50 && !d.is_anomaly));
    }

    #[test]
    fn test_model_scores_new_rows_with_frozen_statistics() {
        let features = arr2(&[
            [10.0, 1.0],
            [11.0, 1.2],
            [12.0, 0.9],
            [10.5, 1.1],
            [11.5, 1.0],
            [10.2, 0.95],
        ]);
        let model = AnomalyModel::fit(&features, &small_config()).unwrap();

        let typical = model.score(ndarray::arr1(&[11.0, 1.0]).view()).unwrap();
        let extreme = model.score(ndarray::arr1(&[50.0, 9.0]).view()).unwrap();
        assert!(extreme > typical);

        // Scoring is a pure function of the frozen model
        let again = model.score(ndarray::arr1(&[11.0, 1.0]).view()).unwrap();
        assert_eq!(typical, again);
    }
}
