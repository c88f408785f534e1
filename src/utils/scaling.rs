use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::utils::AnalysisError;

/// Frozen per-column statistics for standard scaling: (x - mean) / std
///
/// Fitted once over a working set and then passed explicitly to every
/// consumer, so two transforms of the same row always agree within a run.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Array1<f64>,
    stds: Array1<f64>,
}

impl StandardScaler {
    /// Compute column means and population standard deviations
    ///
    /// # Arguments
    /// * `features` - Feature matrix (rows=samples, cols=features)
    ///
    /// # Returns
    /// * `Ok(scaler)` - Frozen statistics
    /// * `Err(AnalysisError)` - If the matrix has no rows or no columns
    pub fn fit(features: &Array2<f64>) -> Result<Self, AnalysisError> {
        if features.nrows() == 0 || features.ncols() == 0 {
            return Err(AnalysisError::ValidationError(
                "cannot fit scaler on an empty feature matrix".to_string(),
            ));
        }

        let means = features.mean_axis(Axis(0)).ok_or_else(|| {
            AnalysisError::ValidationError("cannot compute column means".to_string())
        })?;
        let stds = features.std_axis(Axis(0), 0.0);

        Ok(Self { means, stds })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn stds(&self) -> &Array1<f64> {
        &self.stds
    }

    /// Indices of columns with zero variance; these always scale to 0.0
    pub fn constant_columns(&self) -> Vec<usize> {
        self.stds
            .iter()
            .enumerate()
            .filter(|(_, std)| std.abs() < f64::EPSILON)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Scale a single row
    pub fn transform_row(&self, row: ArrayView1<f64>) -> Result<Array1<f64>, AnalysisError> {
        if row.len() != self.n_features() {
            return Err(AnalysisError::ValidationError(format!(
                "row has {} features, scaler was fitted on {}",
                row.len(),
                self.n_features()
            )));
        }

        Ok(Array1::from_iter(
            row.iter()
                .zip(self.means.iter().zip(self.stds.iter()))
                .map(|(&x, (&mean, &std))| scale_value(x, mean, std)),
        ))
    }

    /// Scale every row of a feature matrix
    pub fn transform(&self, features: &Array2<f64>) -> Result<Array2<f64>, AnalysisError> {
        if features.ncols() != self.n_features() {
            return Err(AnalysisError::ValidationError(format!(
                "matrix has {} features, scaler was fitted on {}",
                features.ncols(),
                self.n_features()
            )));
        }

        let mut scaled = features.clone();
        for (col_idx, mut col) in scaled.axis_iter_mut(Axis(1)).enumerate() {
            let mean = self.means[col_idx];
            let std = self.stds[col_idx];
            col.mapv_inplace(|x| scale_value(x, mean, std));
        }

        Ok(scaled)
    }
}

fn scale_value(x: f64, mean: f64, std: f64) -> f64 {
    if std.abs() < f64::EPSILON {
        0.0
    } else {
        (x - mean) / std
    }
}

/// Fit a scaler and apply it in one step
pub fn standard_scale(
    features: &Array2<f64>,
) -> Result<(StandardScaler, Array2<f64>), AnalysisError> {
    let scaler = StandardScaler::fit(features)?;
    let scaled = scaler.transform(features)?;
    Ok((scaler, scaled))
}
