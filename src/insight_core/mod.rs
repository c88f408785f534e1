/// Anomaly scoring core: feature building, isolation forest, deal scoring
pub mod comps;
pub mod deal;
pub mod feature;
pub mod forest;
pub mod model;
pub mod path_length;
pub mod tree;

// Re-export commonly used items
pub use deal::{classify_deals, DealScore};
pub use forest::{Forest, ForestOptions};
pub use model::{run_isolation_forest, AnomalyModel, AnomalyResult};
