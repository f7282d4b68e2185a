//! Error types for the segmentation pipeline.

use thiserror::Error;

use crate::model::SEGMENT_COUNT;

/// Errors that can terminate a segmentation run.
///
/// All three data variants are terminal: the pipeline returns no partial
/// segmentation. Clustering non-convergence is not an error and never
/// surfaces here.
#[derive(Debug, Error)]
pub enum SegmentationError {
    /// The input order set is empty.
    #[error("no order data for segmentation")]
    DataAbsent,

    /// Fewer customers survived cleaning than clusters to populate.
    #[error("not enough customers for clustering: required {required}, actual {actual}")]
    InsufficientData {
        /// Minimum cleaned rows required
        required: usize,
        /// Cleaned rows actually available
        actual: usize,
    },

    /// No order carries a parsable `createdAt`, so the reference date
    /// for recency cannot be computed.
    #[error("no order has a usable createdAt; reference date cannot be computed")]
    ParseFailure,

    /// Unexpected fault caught at the pipeline boundary.
    #[error("internal segmentation failure: {0}")]
    Internal(String),
}

impl SegmentationError {
    /// Create an InsufficientData error against the fixed cluster count.
    pub fn insufficient(actual: usize) -> Self {
        Self::InsufficientData {
            required: SEGMENT_COUNT,
            actual,
        }
    }

    /// Create an Internal error from any message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Process exit code the binary maps this error to.
    ///
    /// Data errors exit with 2, internal faults with 3. Usage and I/O
    /// problems outside the core use 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Internal(_) => 3,
            _ => 2,
        }
    }
}
