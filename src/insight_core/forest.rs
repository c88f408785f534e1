use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use super::path_length::{average_path_length, height_limit};
use super::tree::IsolationTree;
use crate::utils::AnalysisError;

/// Forest construction options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestOptions {
    /// Number of trees to build
    pub n_trees: usize,
    /// Requested per-tree sample size; capped at the number of training rows
    pub sample_size: usize,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            sample_size: 256,
        }
    }
}

/// An immutable ensemble of isolation trees
///
/// Built once, then only scored against. Scores depend on the complete set
/// of trees, so construction finishes before the value is handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<IsolationTree>,
    n_features: usize,
    sample_size: usize,
    /// `c(ψ)`, the normaliser for average path lengths
    avg_path_length_c: f64,
}

impl Forest {
    /// Build a forest from training rows
    ///
    /// One seed per tree is drawn from `rng` up front, so the result is the
    /// same no matter how rayon schedules the tree builds.
    pub fn build<R: Rng + ?Sized>(
        training_data: &Array2<f64>,
        options: &ForestOptions,
        rng: &mut R,
    ) -> Result<Self, AnalysisError> {
        let n_rows = training_data.nrows();
        if options.n_trees == 0 {
            return Err(AnalysisError::ModelError(
                "forest needs at least one tree".to_string(),
            ));
        }
        if training_data.ncols() == 0 {
            return Err(AnalysisError::ModelError(
                "training data has no features".to_string(),
            ));
        }

        let sample_size = options.sample_size.min(n_rows);
        if sample_size < 2 {
            return Err(AnalysisError::ModelError(format!(
                "sub-sample size must be >= 2, got {} ({} training rows)",
                sample_size, n_rows
            )));
        }

        let max_depth = height_limit(sample_size);
        debug!(
            n_trees = options.n_trees,
            sample_size, max_depth, n_rows, "Building isolation forest"
        );

        let seeds: Vec<u64> = (0..options.n_trees).map(|_| rng.gen()).collect();
        let trees: Vec<IsolationTree> = seeds
            .into_par_iter()
            .map(|seed| {
                let mut tree_rng = StdRng::seed_from_u64(seed);
                let mut sample = index::sample(&mut tree_rng, n_rows, sample_size).into_vec();
                IsolationTree::build(training_data, &mut sample, max_depth, &mut tree_rng)
            })
            .collect();

        Ok(Self {
            trees,
            n_features: training_data.ncols(),
            sample_size,
            avg_path_length_c: average_path_length(sample_size),
        })
    }

    pub fn trees(&self) -> &[IsolationTree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Effective per-tree sample size ψ
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Mean path length of `x` across all trees, `E[h(x)]`
    pub fn mean_path_length(&self, x: ArrayView1<f64>) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.path_length(x)).sum();
        total / self.trees.len() as f64
    }

    /// Anomaly score `2^(-E[h(x)] / c(ψ))` in (0, 1); higher is more anomalous
    pub fn score(&self, x: ArrayView1<f64>) -> f64 {
        2.0_f64.powf(-self.mean_path_length(x) / self.avg_path_length_c)
    }

    /// Score every row of `data` in parallel, preserving row order
    pub fn score_batch(&self, data: &Array2<f64>) -> Result<Vec<f64>, AnalysisError> {
        if data.ncols() != self.n_features {
            return Err(AnalysisError::ValidationError(format!(
                "query rows have {} features, forest was trained on {}",
                data.ncols(),
                self.n_features
            )));
        }

        let rows: Vec<ArrayView1<f64>> = data.rows().into_iter().collect();
        Ok(rows.par_iter().map(|row| self.score(*row)).collect())
    }
}
