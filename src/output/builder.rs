use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dataset::Listing;
use crate::engine::{ScoredBatch, ScoredListing, SCORE_KEYS};
use crate::insight_core::feature::FeatureRecord;
use crate::insight_core::comps::{CompAnalysis, CompReport};
use crate::insight_core::AnomalyResult;
use crate::stats::CitySummary;
use crate::utils::AnalysisError;

#[derive(Debug, Serialize)]
pub struct ScoredOutput<'a> {
    pub properties: &'a [ScoredListing],
    pub summary: ScoreSummary,
}

#[derive(Debug, Serialize)]
pub struct ScoreSummary {
    pub total: usize,
    pub deals_found: usize,
    pub cities: BTreeMap<String, CitySummary>,
}

#[derive(Debug, Serialize)]
pub struct CompsOutput<'a> {
    pub properties: &'a [CompAnalysis],
    pub summary: CompsSummary,
}

#[derive(Debug, Serialize)]
pub struct CompsSummary {
    pub analyzed: usize,
    pub deals: usize,
    pub overpriced: usize,
}

/// Attach deal scores to the listings that produced each feature record
///
/// # Arguments
/// * `listings` - Full listing set the records were built from
/// * `records` - Accepted feature records, in scoring order
/// * `result` - Anomaly scores and deal classification for those records
///
/// # Returns
/// * `Ok(Vec<ScoredListing>)` - One scored listing per record
/// * `Err(AnalysisError)` - If lengths disagree or a record points outside `listings`
pub fn build_scored_listings(
    listings: &[Listing],
    records: &[FeatureRecord],
    result: &AnomalyResult,
) -> Result<Vec<ScoredListing>, AnalysisError> {
    if records.len() != result.scores.len() || result.scores.len() != result.deals.len() {
        return Err(AnalysisError::ValidationError(
            "records, scores, and deals must have same length".to_string(),
        ));
    }

    records
        .iter()
        .zip(result.scores.iter().zip(result.deals.iter()))
        .map(|(record, (&anomaly_score, deal))| {
            let listing = listings.get(record.index).ok_or_else(|| {
                AnalysisError::ValidationError(format!(
                    "record index {} out of range for {} listings",
                    record.index,
                    listings.len()
                ))
            })?;

            Ok(ScoredListing {
                listing: listing.without(&SCORE_KEYS),
                deal_score: deal.deal_score,
                is_anomaly: u8::from(deal.is_anomaly),
                price_per_sqft: record.price_per_area as i64,
                anomaly_score,
                price_per_area: record.price_per_area,
            })
        })
        .collect()
}

/// Build the scored document: properties plus a per-city summary
pub fn build_scored_output(batch: &ScoredBatch) -> ScoredOutput<'_> {
    ScoredOutput {
        properties: &batch.listings,
        summary: ScoreSummary {
            total: batch.len(),
            deals_found: batch.deals_found(),
            cities: batch.city_summary(),
        },
    }
}

/// Build the comp-analysis document
pub fn build_comps_output(report: &CompReport) -> CompsOutput<'_> {
    CompsOutput {
        properties: &report.analyses,
        summary: CompsSummary {
            analyzed: report.analyses.len(),
            deals: report.deals().len(),
            overpriced: report.overpriced().len(),
        },
    }
}

/// Serialize a document as JSON to `path`
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, document: &T) -> crate::Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, document)
        .with_context(|| format!("Failed to write JSON to {:?}", path))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush {:?}", path))?;
    tracing::info!("Wrote output to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight_core::DealScore;

    fn record(index: usize, ppsf: f64) -> FeatureRecord {
        FeatureRecord {
            index,
            area: 1000.0,
            bedroom_count: 3.0,
            bathroom_count: 2.0,
            year_built: 1990.0,
            price_per_area: ppsf,
        }
    }

    fn result(n: usize) -> AnomalyResult {
        AnomalyResult {
            scores: vec![0.5; n],
            deals: vec![
                DealScore {
                    deal_score: 42,
                    is_anomaly: true,
                };
                n
            ],
        }
    }

    #[test]
    fn test_build_scored_listings() {
        let listings = vec![
            Listing::new().with("address", "skipped"),
            Listing::new().with("address", "kept").with("isAnomaly", 0),
        ];
        let scored = build_scored_listings(&listings, &[record(1, 250.9)], &result(1)).unwrap();

        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].listing.address(), Some("kept"));
        assert!(scored[0].listing.get_field("isAnomaly").is_none());
        assert_eq!(scored[0].is_anomaly, 1);
        assert_eq!(scored[0].deal_score, 42);
        assert_eq!(scored[0].price_per_sqft, 250);
    }

    #[test]
    fn test_build_scored_listings_length_mismatch() {
        let listings = vec![Listing::new(), Listing::new()];
        let records = [record(0, 1.0), record(1, 1.0)];
        assert!(build_scored_listings(&listings, &records, &result(1)).is_err());
    }

    #[test]
    fn test_build_scored_listings_bad_index() {
        let listings = vec![Listing::new()];
        assert!(build_scored_listings(&listings, &[record(3, 1.0)], &result(1)).is_err());
    }

    #[test]
    fn test_write_scored_output() {
        let listings = vec![Listing::new().with("city", "Newport")];
        let scored = build_scored_listings(&listings, &[record(0, 400.0)], &result(1)).unwrap();
        let batch = ScoredBatch {
            listings: scored,
            excluded: 0,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scored.json");
        write_json(&path, &build_scored_output(&batch)).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["summary"]["total"], 1);
        assert_eq!(written["summary"]["deals_found"], 1);
        assert_eq!(written["summary"]["cities"]["Newport"]["avg_ppsf"], 400);
        assert_eq!(written["properties"][0]["city"], "Newport");
        assert_eq!(written["properties"][0]["dealScore"], 42);
    }
}
