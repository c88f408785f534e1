/// Scored and comp-analysis output documents
pub mod builder;

// Re-export commonly used functions
pub use builder::{build_comps_output, build_scored_listings, build_scored_output, write_json};
