/// Utility modules for error handling, validation and scaling
pub mod error;
pub mod scaling;
pub mod type_convert;

// Re-export commonly used types
pub use error::AnalysisError;
pub use scaling::{standard_scale, StandardScaler};
pub use type_convert::{flagged_count, normalize_scores, validate_contamination};
