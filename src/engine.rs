use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::config::EngineConfig;
use crate::dataset::{Listing, ListingSet};
use crate::insight_core::feature::build_feature_records;
use crate::insight_core::comps::{find_comparables, CompReport};
use crate::insight_core::run_isolation_forest;
use crate::output::build_scored_listings;
use crate::stats::{summarize_by_city, CitySummary, Statistics};
use crate::utils::AnalysisError;

/// Output keys added to every scored listing
pub const SCORE_KEYS: [&str; 3] = ["dealScore", "isAnomaly", "pricePerSqft"];

/// A listing augmented with its deal classification
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredListing {
    #[serde(flatten)]
    pub listing: Listing,
    /// 0-100, relative to the batch it was scored in
    pub deal_score: u8,
    /// 1 when flagged as a deal, else 0
    pub is_anomaly: u8,
    pub price_per_sqft: i64,
    #[serde(skip)]
    pub anomaly_score: f64,
    #[serde(skip)]
    pub price_per_area: f64,
}

/// Result of scoring one working set
///
/// Deal scores are min-max rescaled within this batch and are not
/// comparable with scores from a different batch.
#[derive(Debug, Clone)]
pub struct ScoredBatch {
    pub listings: Vec<ScoredListing>,
    /// Listings dropped by the validity filters
    pub excluded: usize,
}

impl ScoredBatch {
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn deals_found(&self) -> usize {
        self.listings.iter().filter(|l| l.is_anomaly == 1).count()
    }

    /// Unsold listings by deal score, highest first
    pub fn top_for_sale(&self, n: usize) -> Vec<&ScoredListing> {
        let mut for_sale: Vec<&ScoredListing> = self
            .listings
            .iter()
            .filter(|l| !l.listing.is_sold())
            .collect();
        for_sale.sort_by(|a, b| b.deal_score.cmp(&a.deal_score));
        for_sale.truncate(n);
        for_sale
    }

    pub fn city_summary(&self) -> BTreeMap<String, CitySummary> {
        summarize_by_city(&self.listings)
    }

    /// Cities with at least one deal, most deals first
    pub fn cities_with_deals(&self) -> Vec<(String, CitySummary)> {
        let mut cities: Vec<(String, CitySummary)> = self
            .city_summary()
            .into_iter()
            .filter(|(_, summary)| summary.deals > 0)
            .collect();
        cities.sort_by(|a, b| b.1.deals.cmp(&a.1.deals));
        cities
    }

    pub fn deal_score_stats(&self) -> Option<Statistics> {
        let values: Vec<f64> = self.listings.iter().map(|l| l.deal_score as f64).collect();
        Statistics::compute("dealScore", &values)
    }
}

/// The main engine for scoring listing sets
#[derive(Debug, Clone)]
pub struct DealEngine {
    config: EngineConfig,
}

impl DealEngine {
    /// Create a new engine, validating the configuration
    pub fn new(config: EngineConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score every valid listing in the set
    ///
    /// Returns `AnalysisError::InsufficientData` when fewer than
    /// `filters.min_records` listings pass the validity filters.
    pub fn score(&self, set: &ListingSet) -> Result<ScoredBatch, AnalysisError> {
        let features = build_feature_records(&set.listings, &self.config.filters);
        info!(
            dataset = %set.name,
            analyzed = features.len(),
            excluded = features.excluded,
            "Analyzing listings"
        );

        let required = self.config.filters.min_records;
        if features.len() < required {
            return Err(AnalysisError::InsufficientData {
                found: features.len(),
                required,
            });
        }

        let result = run_isolation_forest(&features.to_matrix(), &self.config.forest)?;

        let listings = build_scored_listings(&set.listings, &features.records, &result)?;

        let batch = ScoredBatch {
            listings,
            excluded: features.excluded,
        };
        info!(deals = batch.deals_found(), "Deal scoring complete");

        Ok(batch)
    }

    /// Run the comparable-sales estimator over the set
    pub fn comps(&self, set: &ListingSet) -> Result<CompReport, AnalysisError> {
        find_comparables(&set.listings, &self.config.filters, &self.config.comps)
    }
}
