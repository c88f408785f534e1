use super::error::AnalysisError;

/// Largest contamination fraction accepted for deal flagging
pub const MAX_CONTAMINATION: f64 = 0.5;

/// Validate contamination is within [0, 0.5]
///
/// # Arguments
/// * `contamination` - Fraction of the working set expected to be anomalous
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(AnalysisError::ValidationError)` if out of range or not finite
pub fn validate_contamination(contamination: f64) -> Result<(), AnalysisError> {
    if !(0.0..=MAX_CONTAMINATION).contains(&contamination) {
        return Err(AnalysisError::ValidationError(format!(
            "contamination must be 0-{}, got {}",
            MAX_CONTAMINATION, contamination
        )));
    }
    Ok(())
}

/// Number of records flagged for a given contamination, `round(contamination * n)`
pub fn flagged_count(contamination: f64, n: usize) -> usize {
    ((contamination * n as f64).round() as usize).min(n)
}

/// Min-max rescale raw values to 0-1 range
///
/// Returns `None` when every value is equal (no spread to rescale over).
pub fn normalize_scores(raw_scores: &[f64]) -> Option<Vec<f64>> {
    if raw_scores.is_empty() {
        return Some(Vec::new());
    }

    let min = raw_scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = raw_scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if range <= 0.0 {
        return None;
    }

    Some(raw_scores.iter().map(|&s| (s - min) / range).collect())
}
