//! Deal Insight Engine - unsupervised deal scoring for real-estate listings
//!
//! Listings are turned into fixed-length feature vectors, standardized, and
//! scored with an isolation forest; the most anomalously cheap listings in a
//! batch get the highest deal scores.

pub mod config;
pub mod dataset;
pub mod engine;
pub mod insight_core;
pub mod output;
pub mod stats;
pub mod utils;

pub use config::EngineConfig;
pub use dataset::{Listing, ListingSet};
pub use engine::{DealEngine, ScoredBatch, ScoredListing};
pub use stats::Statistics;
pub use utils::AnalysisError;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
