use ndarray::Array2;
use tracing::debug;

use crate::config::FilterConfig;
use crate::dataset::Listing;
use crate::utils::AnalysisError;

/// Number of features per listing
pub const N_FEATURES: usize = 5;

/// Feature names in column order
pub const FEATURE_NAMES: [&str; N_FEATURES] =
    ["area", "bedroomCount", "bathroomCount", "yearBuilt", "pricePerArea"];

/// Numeric features of one accepted listing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
    /// Index of the source listing in its `ListingSet`
    pub index: usize,
    pub area: f64,
    pub bedroom_count: f64,
    pub bathroom_count: f64,
    pub year_built: f64,
    pub price_per_area: f64,
}

impl FeatureRecord {
    pub fn values(&self) -> [f64; N_FEATURES] {
        [
            self.area,
            self.bedroom_count,
            self.bathroom_count,
            self.year_built,
            self.price_per_area,
        ]
    }
}

/// Accepted feature records plus the number of listings filtered out
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub records: Vec<FeatureRecord>,
    pub excluded: usize,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Feature matrix (rows=records, cols=`FEATURE_NAMES`)
    pub fn to_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.records.len(), N_FEATURES), |(row, col)| {
            self.records[row].values()[col]
        })
    }
}

/// Build one feature record, or `None` when the listing fails the validity filters
///
/// Price, area and bedroom count must be present and non-zero; area must lie
/// in `(0, max_area]` and price in `(min_price, max_price]`. Missing bathroom
/// count defaults to 0 and missing construction year to the configured year.
pub fn build_feature_record(
    index: usize,
    listing: &Listing,
    filters: &FilterConfig,
) -> Option<FeatureRecord> {
    let price = truthy(listing.price())?;
    let area = truthy(listing.sqft())?;
    let bedroom_count = truthy(listing.beds())?;

    if area <= 0.0 || area > filters.max_area {
        return None;
    }
    if price <= filters.min_price || price > filters.max_price {
        return None;
    }

    let bathroom_count = listing.baths().filter(|b| b.is_finite()).unwrap_or(0.0);
    let year_built = truthy(listing.year_built()).unwrap_or(filters.default_year_built);

    Some(FeatureRecord {
        index,
        area,
        bedroom_count,
        bathroom_count,
        year_built,
        price_per_area: price / area,
    })
}

/// Build feature records for every listing that passes the filters
pub fn build_feature_records(listings: &[Listing], filters: &FilterConfig) -> FeatureSet {
    let records: Vec<FeatureRecord> = listings
        .iter()
        .enumerate()
        .filter_map(|(idx, listing)| build_feature_record(idx, listing, filters))
        .collect();
    let excluded = listings.len() - records.len();

    debug!(
        accepted = records.len(),
        excluded, "Built feature records"
    );

    FeatureSet { records, excluded }
}

fn truthy(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

/// Validate feature matrix dimensions and values
///
/// # Arguments
/// * `features` - Feature matrix to validate
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(AnalysisError::ValidationError)` if invalid
pub fn validate_features(features: &Array2<f64>) -> Result<(), AnalysisError> {
    if features.nrows() == 0 {
        return Err(AnalysisError::ValidationError(
            "feature matrix cannot be empty".to_string(),
        ));
    }

    if features.ncols() == 0 {
        return Err(AnalysisError::ValidationError(
            "feature matrix must have at least one column".to_string(),
        ));
    }

    for value in features.iter() {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::ValidationError(
                "feature matrix contains NaN or Inf values".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn listing(price: f64, sqft: f64, beds: f64) -> Listing {
        Listing::new()
            .with("price", price)
            .with("sqft", sqft)
            .with("beds", beds)
    }

    #[test]
    fn test_build_feature_record_defaults() {
        let record = build_feature_record(0, &listing(300_000.0, 1500.0, 3.0), &FilterConfig::default())
            .unwrap();

        assert_eq!(record.area, 1500.0);
        assert_eq!(record.bathroom_count, 0.0);
        assert_eq!(record.year_built, 1970.0);
        assert!((record.price_per_area - 200.0).abs() < 1e-10);
    }

    #[test]
    fn test_build_feature_record_zero_year_uses_default() {
        let l = listing(300_000.0, 1500.0, 3.0)
            .with("yearBuilt", 0)
            .with("baths", 2.5);
        let record = build_feature_record(0, &l, &FilterConfig::default()).unwrap();
        assert_eq!(record.year_built, 1970.0);
        assert_eq!(record.bathroom_count, 2.5);
    }

    #[test]
    fn test_filters() {
        let filters = FilterConfig::default();

        // price bounds: (50000, 5000000]
        assert!(build_feature_record(0, &listing(50_000.0, 1500.0, 3.0), &filters).is_none());
        assert!(build_feature_record(0, &listing(50_001.0, 1500.0, 3.0), &filters).is_some());
        assert!(build_feature_record(0, &listing(5_000_000.0, 1500.0, 3.0), &filters).is_some());
        assert!(build_feature_record(0, &listing(5_000_001.0, 1500.0, 3.0), &filters).is_none());

        // area bounds: (0, 10000]
        assert!(build_feature_record(0, &listing(300_000.0, 10_000.0, 3.0), &filters).is_some());
        assert!(build_feature_record(0, &listing(300_000.0, 10_001.0, 3.0), &filters).is_none());
        assert!(build_feature_record(0, &listing(300_000.0, -5.0, 3.0), &filters).is_none());

        // missing or zero required fields
        assert!(build_feature_record(0, &listing(300_000.0, 1500.0, 0.0), &filters).is_none());
        let no_beds = Listing::new().with("price", 300_000).with("sqft", 1500);
        assert!(build_feature_record(0, &no_beds, &filters).is_none());
    }

    #[test]
    fn test_build_feature_records_counts_excluded() {
        let listings = vec![
            listing(300_000.0, 1500.0, 3.0),
            listing(10_000.0, 1500.0, 3.0),
            listing(400_000.0, 2000.0, 4.0),
            Listing::new(),
        ];
        let set = build_feature_records(&listings, &FilterConfig::default());

        assert_eq!(set.len(), 2);
        assert_eq!(set.excluded, 2);
        assert_eq!(set.records[0].index, 0);
        assert_eq!(set.records[1].index, 2);

        let matrix = set.to_matrix();
        assert_eq!(matrix.dim(), (2, N_FEATURES));
        assert_eq!(matrix[[1, 0]], 2000.0);
        assert_eq!(matrix[[1, 4]], 200.0);
    }

    #[test]
    fn test_validate_features_valid() {
        let features = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        assert!(validate_features(&features).is_ok());
    }

    #[test]
    fn test_validate_features_empty_rows() {
        let features = Array2::<f64>::zeros((0, 2));
        assert!(validate_features(&features).is_err());
    }

    #[test]
    fn test_validate_features_with_nan() {
        let features = arr2(&[[1.0, f64::NAN], [3.0, 4.0]]);
        let result = validate_features(&features);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("NaN"));
    }
}
