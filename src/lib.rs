//! SegmentForge: customer segmentation from raw order history.
//!
//! This library derives RFM (Recency, Frequency, Monetary) features from
//! order records, standardizes them, clusters customers into three value
//! tiers with deterministic K-Means, and labels the tiers Low/Mid/High
//! Value by mean spend.

use std::panic::{catch_unwind, AssertUnwindSafe};

pub mod cli;
pub mod data;
pub mod error;
pub mod model;
pub mod scale;
pub mod segment;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{OrderRecord, SegmentationRequest};
pub use error::SegmentationError;
pub use model::{DEFAULT_MAX_ITERATIONS, DEFAULT_RESTARTS, DEFAULT_SEED, SEGMENT_COUNT};
pub use scale::Scaler;
pub use segment::{CustomerSegment, SegmentLabel, SegmentSummary, SegmentationResult};

/// Common result type used at the binary boundary
pub type Result<T> = anyhow::Result<T>;

/// Tunables for one segmentation invocation.
#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    /// Base seed; restart `i` uses `seed + i`
    pub seed: u64,
    /// Independent clustering restarts
    pub n_restarts: usize,
    /// Lloyd iteration cap per restart
    pub max_iterations: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            n_restarts: DEFAULT_RESTARTS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Segment customers from a materialized order sequence.
///
/// Pure and stateless: identical input rows in identical order with an
/// identical config yield an identical result. Any unexpected panic inside
/// the pipeline is caught here and reported as
/// [`SegmentationError::Internal`]; the process never aborts because of it.
pub fn segment_customers(
    orders: &[OrderRecord],
    config: &SegmentationConfig,
) -> std::result::Result<SegmentationResult, SegmentationError> {
    match catch_unwind(AssertUnwindSafe(|| run_pipeline(orders, config))) {
        Ok(outcome) => outcome,
        Err(panic) => Err(SegmentationError::internal(panic_message(&panic))),
    }
}

fn run_pipeline(
    orders: &[OrderRecord],
    config: &SegmentationConfig,
) -> std::result::Result<SegmentationResult, SegmentationError> {
    let features = data::build_features(orders)?;
    let rows = data::clean_features(features)?;
    let raw = data::to_matrix(&rows);
    let scaler = Scaler::fit(&raw);
    let scaled = scaler.transform(&raw);
    let fit = model::fit_kmeans(&scaled, config.seed, config.n_restarts, config.max_iterations)?;
    Ok(segment::build_result(rows, &fit, scaler))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic in segmentation pipeline".to_string()
    }
}
