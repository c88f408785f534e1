use thiserror::Error;

/// Custom error type for analysis operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Validation errors (e.g., invalid contamination, malformed feature matrix)
    #[error("ValidationError: {0}")]
    ValidationError(String),
    /// Working set below the minimum size needed to build a forest
    #[error("InsufficientData: {found} records available, at least {required} required")]
    InsufficientData { found: usize, required: usize },
    /// Model training/scoring errors
    #[error("ModelError: {0}")]
    ModelError(String),
}
