//! Surrogate keys for partitioned execution
//!
//! A key is `(partition_index << 33) | local_counter`. Each partition numbers
//! its own rows from zero, so no coordination between partitions is needed.
//! Keys are unique across partitions and strictly increasing within one, but
//! they are not contiguous and carry no global order across partitions.

use super::error::TransformError;

/// Bits reserved for the per-partition counter
pub const PARTITION_SHIFT: u32 = 33;

/// Largest per-partition counter value
pub const MAX_LOCAL_ID: u64 = (1 << PARTITION_SHIFT) - 1;

/// Number of partitions whose index fits the remaining positive bits of an `i64`
pub const MAX_PARTITIONS: usize = 1 << (63 - PARTITION_SHIFT);

/// Build the surrogate key for row `local` of partition `partition`
pub fn surrogate_key(partition: usize, local: u64) -> Result<i64, TransformError> {
    if partition >= MAX_PARTITIONS {
        return Err(TransformError::PartitionIndexOverflow { partition });
    }
    if local > MAX_LOCAL_ID {
        return Err(TransformError::LocalCounterOverflow { partition });
    }
    Ok(((partition as i64) << PARTITION_SHIFT) | local as i64)
}

/// Split a surrogate key back into `(partition, local)`
pub fn split_key(key: i64) -> (usize, u64) {
    let key = key as u64;
    ((key >> PARTITION_SHIFT) as usize, key & MAX_LOCAL_ID)
}

/// Hands out keys for one partition in increasing order
#[derive(Debug)]
pub struct KeyAllocator {
    partition: usize,
    next: u64,
}

impl KeyAllocator {
    pub fn new(partition: usize) -> Self {
        Self { partition, next: 0 }
    }

    pub fn next_key(&mut self) -> Result<i64, TransformError> {
        let key = surrogate_key(self.partition, self.next)?;
        self.next += 1;
        Ok(key)
    }
}
