//! HarReplay — core analysis library: HAR session normalization,
//! shared-header baseline extraction, and cross-request value-origin
//! inference.

pub mod baseline;
pub mod config;
pub mod har;
pub mod inference;
pub mod normalize;
pub mod pipeline;
pub mod similarity;
pub mod types;

pub use baseline::extract_baseline;
pub use config::AnalysisConfig;
pub use har::HarDocument;
pub use inference::OriginResolver;
pub use normalize::{normalize, NormalizedSession};
pub use pipeline::{analyze, analyze_har};
pub use similarity::{longest_common_substring, overlap_ratio};
pub use types::*;
