//! Nearest-neighbour comparable-sales estimator
//!
//! Every active listing is matched against its nearest sold listings in a
//! standardized feature space, and the comps' prices give an estimated value.

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::feature::build_feature_record;
use crate::config::{CompsConfig, FilterConfig};
use crate::dataset::Listing;
use crate::utils::{AnalysisError, StandardScaler};

/// Number of features used for comp matching
pub const COMP_FEATURES: usize = 5;

/// Keys this module writes onto listings; stripped from inputs to avoid duplicates
const COMP_KEYS: [&str; 8] = [
    "similarityRank",
    "similarityDistance",
    "similarComps",
    "estimatedValue",
    "suggestedPrice",
    "compAvgPpsf",
    "priceDiff",
    "priceDiffPct",
];

/// A sold listing matched to an active one
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparable {
    #[serde(flatten)]
    pub listing: Listing,
    /// 1-based, closest first
    pub similarity_rank: usize,
    pub similarity_distance: f64,
}

/// Comp-based valuation of one active listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompAnalysis {
    #[serde(flatten)]
    pub listing: Listing,
    pub similar_comps: Vec<Comparable>,
    pub estimated_value: i64,
    pub suggested_price: i64,
    pub comp_avg_ppsf: i64,
    pub price_diff: i64,
    pub price_diff_pct: f64,
}

#[derive(Debug, Clone)]
pub struct CompReport {
    pub analyses: Vec<CompAnalysis>,
    pub sold_count: usize,
    pub active_count: usize,
    deal_threshold_pct: f64,
    overpriced_threshold_pct: f64,
}

impl CompReport {
    /// Listings priced below their comps by more than the deal threshold, cheapest first
    pub fn deals(&self) -> Vec<&CompAnalysis> {
        let mut deals: Vec<&CompAnalysis> = self
            .analyses
            .iter()
            .filter(|a| a.price_diff_pct < self.deal_threshold_pct)
            .collect();
        deals.sort_by(|a, b| a.price_diff_pct.total_cmp(&b.price_diff_pct));
        deals
    }

    /// Listings priced above their comps by more than the overpriced threshold
    pub fn overpriced(&self) -> Vec<&CompAnalysis> {
        let mut overpriced: Vec<&CompAnalysis> = self
            .analyses
            .iter()
            .filter(|a| a.price_diff_pct > self.overpriced_threshold_pct)
            .collect();
        overpriced.sort_by(|a, b| b.price_diff_pct.total_cmp(&a.price_diff_pct));
        overpriced
    }
}

/// Comp-matching features: sqft/1000, beds, baths, yearBuilt/100, lotSize/10000
///
/// Returns `None` for listings that fail the standard validity filters.
pub fn comp_features(listing: &Listing, filters: &FilterConfig) -> Option<[f64; COMP_FEATURES]> {
    let record = build_feature_record(0, listing, filters)?;
    let lot_size = listing
        .lot_size()
        .filter(|l| l.is_finite())
        .map(|l| l / 10_000.0)
        .unwrap_or(0.0);

    Some([
        record.area / 1000.0,
        record.bedroom_count,
        record.bathroom_count,
        record.year_built / 100.0,
        lot_size,
    ])
}

struct Candidate<'a> {
    listing: &'a Listing,
    features: [f64; COMP_FEATURES],
}

/// Find comparable sold listings for every active listing
///
/// # Arguments
/// * `listings` - Mixed sold and active listings
/// * `filters` - Validity filters shared with the deal scorer
/// * `config` - Neighbour count and deal/overpriced thresholds
///
/// # Returns
/// * `Ok(CompReport)` - One analysis per valid active listing
/// * `Err(AnalysisError::InsufficientData)` - Too few valid sold listings
pub fn find_comparables(
    listings: &[Listing],
    filters: &FilterConfig,
    config: &CompsConfig,
) -> Result<CompReport, AnalysisError> {
    let (sold, active): (Vec<Candidate>, Vec<Candidate>) = listings
        .iter()
        .filter_map(|listing| {
            comp_features(listing, filters).map(|features| Candidate { listing, features })
        })
        .partition(|candidate| candidate.listing.is_sold());

    info!(
        sold = sold.len(),
        active = active.len(),
        "Prepared listings for comp analysis"
    );

    let required = config.min_sold.max(1);
    if sold.len() < required {
        return Err(AnalysisError::InsufficientData {
            found: sold.len(),
            required,
        });
    }

    if active.is_empty() {
        warn!("No active listings to compare against sold comps");
    }

    let sold_matrix = Array2::from_shape_fn((sold.len(), COMP_FEATURES), |(row, col)| {
        sold[row].features[col]
    });
    let index = SoldIndex::fit(sold_matrix)?;
    debug!(points = sold.len(), "Indexed sold listings");

    let k = config.neighbors.min(sold.len());
    let analyses = active
        .par_iter()
        .map(|candidate| {
            let neighbors = index.nearest(&candidate.features, k)?;
            let comps: Vec<Comparable> = neighbors
                .iter()
                .enumerate()
                .map(|(rank, neighbor)| Comparable {
                    listing: sold[neighbor.index].listing.without(&COMP_KEYS),
                    similarity_rank: rank + 1,
                    similarity_distance: round_to(neighbor.distance, 3),
                })
                .collect();
            Ok(analyze(candidate.listing, comps))
        })
        .collect::<Result<Vec<CompAnalysis>, AnalysisError>>()?;

    Ok(CompReport {
        analyses,
        sold_count: sold.len(),
        active_count: active.len(),
        deal_threshold_pct: config.deal_threshold_pct,
        overpriced_threshold_pct: config.overpriced_threshold_pct,
    })
}

/// One sold row matched to a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row of the sold listing in the index
    pub index: usize,
    /// Euclidean distance to the query
    pub distance: f64,
}

/// Standardized sold-listing vectors, searched by exact scan
///
/// Any number of rows may share a coordinate on any axis.
#[derive(Debug, Clone)]
pub struct SoldIndex {
    scaler: StandardScaler,
    points: Array2<f64>,
}

impl SoldIndex {
    /// Fit the scaler on `sold` and store the scaled rows
    pub fn fit(sold: Array2<f64>) -> Result<Self, AnalysisError> {
        let scaler = StandardScaler::fit(&sold)?;
        let points = scaler.transform(&sold)?;
        Ok(Self { scaler, points })
    }

    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// The `k` nearest sold rows to unscaled `features`, closest first
    ///
    /// Equal distances are ordered by row.
    pub fn nearest(
        &self,
        features: &[f64; COMP_FEATURES],
        k: usize,
    ) -> Result<Vec<Neighbor>, AnalysisError> {
        let query = self.scaler.transform_row(ArrayView1::from(&features[..]))?;

        let mut distances: Vec<(usize, f64)> = self
            .points
            .rows()
            .into_iter()
            .enumerate()
            .map(|(row, point)| (row, squared_distance(point, query.view())))
            .collect();
        distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        distances.truncate(k);

        Ok(distances
            .into_iter()
            .map(|(index, squared)| Neighbor {
                index,
                distance: squared.sqrt(),
            })
            .collect())
    }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn analyze(listing: &Listing, comps: Vec<Comparable>) -> CompAnalysis {
    // Both listing and comps passed the validity filters, so price and sqft are present
    let price = listing.price().unwrap_or(0.0);
    let sqft = listing.sqft().unwrap_or(0.0);

    let comp_prices: Vec<f64> = comps
        .iter()
        .filter_map(|c| c.listing.price())
        .collect();
    let comp_ppsf: Vec<f64> = comps
        .iter()
        .filter_map(|c| Some(c.listing.price()? / c.listing.sqft()?))
        .collect();

    let estimated_value = mean(&comp_prices) as i64;
    let comp_avg_ppsf = mean(&comp_ppsf) as i64;
    let suggested_price = (comp_avg_ppsf as f64 * sqft) as i64;
    let price_diff = price as i64 - suggested_price;
    let price_diff_pct = if suggested_price == 0 {
        0.0
    } else {
        round_to(
            (price - suggested_price as f64) / suggested_price as f64 * 100.0,
            1,
        )
    };

    CompAnalysis {
        listing: listing.without(&COMP_KEYS),
        similar_comps: comps,
        estimated_value,
        suggested_price,
        comp_avg_ppsf,
        price_diff,
        price_diff_pct,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
