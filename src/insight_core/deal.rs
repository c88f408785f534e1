use std::cmp::Ordering;

use tracing::warn;

use crate::utils::{flagged_count, normalize_scores, validate_contamination, AnalysisError};

/// Deal score assigned to every record when the batch has no score spread
pub const DEGENERATE_DEAL_SCORE: u8 = 50;

/// Batch-relative deal classification of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DealScore {
    /// 0-100, higher = more anomalously cheap within this batch
    pub deal_score: u8,
    /// In the top `contamination` fraction by anomaly score
    pub is_anomaly: bool,
}

/// Raw decision values `1 - 2·score`; larger means more normal
pub fn decision_values(anomaly_scores: &[f64]) -> Vec<f64> {
    anomaly_scores.iter().map(|&s| 1.0 - 2.0 * s).collect()
}

/// Turn anomaly scores for a whole batch into deal scores and flags
///
/// Decision values are min-max rescaled to [0, 100] across the batch and
/// inverted, so the result is only comparable within the same batch. The
/// top `round(contamination × N)` records by anomaly score are flagged,
/// ties broken by input order. If all decision values are equal, every
/// record gets `DEGENERATE_DEAL_SCORE` and no flag.
pub fn classify_deals(
    anomaly_scores: &[f64],
    contamination: f64,
) -> Result<Vec<DealScore>, AnalysisError> {
    validate_contamination(contamination)?;

    if anomaly_scores.iter().any(|s| !s.is_finite()) {
        return Err(AnalysisError::ValidationError(
            "anomaly scores contain NaN or Inf values".to_string(),
        ));
    }

    let decisions = decision_values(anomaly_scores);
    let Some(rescaled) = normalize_scores(&decisions) else {
        warn!(
            records = anomaly_scores.len(),
            "All decision values are equal, falling back to neutral deal scores"
        );
        return Ok(vec![
            DealScore {
                deal_score: DEGENERATE_DEAL_SCORE,
                is_anomaly: false,
            };
            anomaly_scores.len()
        ]);
    };

    let mut deals: Vec<DealScore> = rescaled
        .iter()
        .map(|&r| DealScore {
            deal_score: (100.0 - r * 100.0).clamp(0.0, 100.0) as u8,
            is_anomaly: false,
        })
        .collect();

    for idx in top_k_indices(anomaly_scores, flagged_count(contamination, anomaly_scores.len())) {
        deals[idx].is_anomaly = true;
    }

    Ok(deals)
}

/// Indices of the `k` largest scores; equal scores keep input order
fn top_k_indices(scores: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    order.truncate(k);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_values() {
        assert_eq!(decision_values(&[0.5, 0.25, 0.75]), vec![0.0, 0.5, -0.5]);
    }

    #[test]
    fn test_classify_extremes() {
        let scores = [0.40, 0.45, 0.80, 0.42, 0.41];
        let deals = classify_deals(&scores, 0.2).unwrap();

        // Most anomalous gets 100, most normal gets 0
        assert_eq!(deals[2].deal_score, 100);
        assert_eq!(deals[0].deal_score, 0);
        assert!(deals.iter().all(|d| d.deal_score <= 100));

        // round(0.2 × 5) = 1 flag, on the highest anomaly score
        assert_eq!(deals.iter().filter(|d| d.is_anomaly).count(), 1);
        assert!(deals[2].is_anomaly);
    }

    #[test]
    fn test_deal_score_truncates() {
        // decision values 0.0, -0.2, -1.0 → rescaled 1.0, 0.8, 0.0
        // 100 - 80 = 20 (floating point may land just below, truncated to 19 or 20)
        let deals = classify_deals(&[0.5, 0.6, 1.0], 0.0).unwrap();
        assert_eq!(deals[0].deal_score, 0);
        assert!(deals[1].deal_score == 19 || deals[1].deal_score == 20);
        assert_eq!(deals[2].deal_score, 100);
        assert!(deals.iter().all(|d| !d.is_anomaly));
    }

    #[test]
    fn test_degenerate_spread() {
        let deals = classify_deals(&[0.5, 0.5, 0.5, 0.5], 0.5).unwrap();
        assert!(deals
            .iter()
            .all(|d| d.deal_score == DEGENERATE_DEAL_SCORE && !d.is_anomaly));
    }

    #[test]
    fn test_flag_count_matches_contamination() {
        let scores: Vec<f64> = (0..105).map(|i| 0.3 + i as f64 * 0.003).collect();
        let deals = classify_deals(&scores, 0.1).unwrap();
        assert_eq!(deals.iter().filter(|d| d.is_anomaly).count(), 11);
        // The flagged ones are the highest scores
        assert!(deals[94..].iter().all(|d| d.is_anomaly));
        assert!(deals[..94].iter().all(|d| !d.is_anomaly));
    }

    #[test]
    fn test_ties_broken_by_order() {
        let scores = [0.7, 0.3, 0.7, 0.7, 0.3];
        let deals = classify_deals(&scores, 0.4).unwrap();
        let flagged: Vec<usize> = deals
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_anomaly)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(flagged, vec![0, 2]);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(classify_deals(&[0.5, 0.6], 0.9).is_err());
        assert!(classify_deals(&[0.5, f64::NAN], 0.1).is_err());
        assert_eq!(classify_deals(&[], 0.1).unwrap(), vec![]);
    }
}
