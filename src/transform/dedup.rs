//! Full-row deduplication

use std::collections::HashSet;

use crate::execution::{ExecutionSession, Partitioned};
use crate::models::RowIdentity;

/// Drop full-row duplicates, keeping the first occurrence in input order
pub fn dedup_rows<T, I>(rows: I) -> Vec<T>
where
    T: RowIdentity,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.identity()))
        .collect()
}

impl<T: RowIdentity + Send> Partitioned<T> {
    /// Globally deduplicate rows
    ///
    /// Rows are shuffled by identity so that every duplicate lands in the same
    /// partition, then each partition is deduplicated independently.
    pub fn distinct(self, session: &ExecutionSession) -> Partitioned<T> {
        self.repartition_by(session, session.shuffle_partitions(), |row| {
            row.identity()
        })
        .map_partitions(session, |_, rows| dedup_rows(rows))
    }
}
