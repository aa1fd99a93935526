//! Error types for table transforms

use thiserror::Error;

use super::keys::{MAX_LOCAL_ID, MAX_PARTITIONS};

/// Errors that can occur while deriving tables
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Partition index does not fit the high-order bits of a surrogate key
    #[error("Surrogate key space exhausted: partition index {partition} exceeds {max}", max = MAX_PARTITIONS - 1)]
    PartitionIndexOverflow { partition: usize },

    /// Partition holds more rows than the low-order bits can number
    #[error("Surrogate key space exhausted: partition {partition} holds more than {max} rows", max = MAX_LOCAL_ID + 1)]
    LocalCounterOverflow { partition: usize },
}
