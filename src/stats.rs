use serde::Serialize;
use std::collections::BTreeMap;

use crate::engine::ScoredListing;

/// City label used for listings without one
pub const UNKNOWN_CITY: &str = "Unknown";

/// Statistics computed over a set of values
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub field: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

impl Statistics {
    /// Compute statistics for a named series of values
    pub fn compute(field: &str, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let sum: f64 = values.iter().sum();
        let mean = sum / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        Some(Statistics {
            field: field.to_string(),
            count,
            mean,
            median,
            min,
            max,
            sum,
        })
    }
}

/// Deal counts and average price per area for one city
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySummary {
    pub count: usize,
    pub deals: usize,
    pub avg_ppsf: i64,
}

/// Group scored listings by city
pub fn summarize_by_city(scored: &[ScoredListing]) -> BTreeMap<String, CitySummary> {
    let mut grouped: BTreeMap<String, (usize, Vec<f64>)> = BTreeMap::new();

    for item in scored {
        let city = item.listing.city().unwrap_or(UNKNOWN_CITY).to_string();
        let entry = grouped.entry(city).or_default();
        if item.is_anomaly == 1 {
            entry.0 += 1;
        }
        entry.1.push(item.price_per_area);
    }

    grouped
        .into_iter()
        .map(|(city, (deals, ppsf))| {
            let avg_ppsf = Statistics::compute("pricePerSqft", &ppsf)
                .map(|s| s.mean as i64)
                .unwrap_or(0);
            (
                city,
                CitySummary {
                    count: ppsf.len(),
                    deals,
                    avg_ppsf,
                },
            )
        })
        .collect()
}
