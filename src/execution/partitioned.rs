//! Partitioned row sets
//!
//! A [`Partitioned`] holds rows split into independent partitions. Transforms
//! run once per partition on the session's worker pool; `repartition_by` is
//! the shuffle boundary that collocates rows sharing a key.

use std::hash::{DefaultHasher, Hash, Hasher};

use rayon::prelude::*;

use super::session::ExecutionSession;

/// Rows split into partitions
#[derive(Debug, Clone, PartialEq)]
pub struct Partitioned<T> {
    partitions: Vec<Vec<T>>,
}

impl<T> Partitioned<T> {
    pub fn new(partitions: Vec<Vec<T>>) -> Self {
        Self { partitions }
    }

    /// All rows in one partition
    pub fn single(rows: Vec<T>) -> Self {
        Self {
            partitions: vec![rows],
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Total number of rows across partitions
    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(Vec::is_empty)
    }

    pub fn partitions(&self) -> &[Vec<T>] {
        &self.partitions
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.partitions.iter().flatten()
    }

    /// Concatenate partitions in partition order
    pub fn into_rows(self) -> Vec<T> {
        self.partitions.into_iter().flatten().collect()
    }
}

impl<T: Send> Partitioned<T> {
    /// Apply `f` to every partition in parallel
    ///
    /// `f` receives the partition index and the partition's rows.
    pub fn map_partitions<U, F>(self, session: &ExecutionSession, f: F) -> Partitioned<U>
    where
        U: Send,
        F: Fn(usize, Vec<T>) -> Vec<U> + Send + Sync,
    {
        let partitions = session.install(|| {
            self.partitions
                .into_par_iter()
                .enumerate()
                .map(|(index, rows)| f(index, rows))
                .collect()
        });
        Partitioned { partitions }
    }

    /// Fallible [`map_partitions`](Self::map_partitions); the first error wins
    pub fn try_map_partitions<U, E, F>(
        self,
        session: &ExecutionSession,
        f: F,
    ) -> Result<Partitioned<U>, E>
    where
        U: Send,
        E: Send,
        F: Fn(usize, Vec<T>) -> Result<Vec<U>, E> + Send + Sync,
    {
        let partitions = session.install(|| {
            self.partitions
                .into_par_iter()
                .enumerate()
                .map(|(index, rows)| f(index, rows))
                .collect::<Result<Vec<_>, E>>()
        })?;
        Ok(Partitioned { partitions })
    }

    /// Hash-shuffle rows into `num_partitions` partitions by `key`
    ///
    /// Rows with equal keys land in the same partition. Assignment uses
    /// [`partition_for`], and within an output partition rows keep their
    /// original relative order, so the result is deterministic for a given
    /// input and partition count under one toolchain.
    pub fn repartition_by<K, F>(
        self,
        session: &ExecutionSession,
        num_partitions: usize,
        key: F,
    ) -> Partitioned<T>
    where
        K: Hash,
        F: Fn(&T) -> K + Send + Sync,
    {
        let num_partitions = num_partitions.max(1);

        let scattered: Vec<Vec<Vec<T>>> = session.install(|| {
            self.partitions
                .into_par_iter()
                .map(|rows| {
                    let mut buckets: Vec<Vec<T>> =
                        (0..num_partitions).map(|_| Vec::new()).collect();
                    for row in rows {
                        let target = partition_for(&key(&row), num_partitions);
                        buckets[target].push(row);
                    }
                    buckets
                })
                .collect()
        });

        let mut partitions: Vec<Vec<T>> = (0..num_partitions).map(|_| Vec::new()).collect();
        for buckets in scattered {
            for (target, rows) in buckets.into_iter().enumerate() {
                partitions[target].extend(rows);
            }
        }

        Partitioned { partitions }
    }
}

impl<T: Sync> Partitioned<T> {
    /// Filter and project rows in parallel, keeping the partitioning
    pub fn filter_map<U, F>(&self, session: &ExecutionSession, f: F) -> Partitioned<U>
    where
        U: Send,
        F: Fn(&T) -> Option<U> + Send + Sync,
    {
        let partitions = session.install(|| {
            self.partitions
                .par_iter()
                .map(|rows| rows.iter().filter_map(&f).collect())
                .collect()
        });
        Partitioned { partitions }
    }
}

impl<T: Send> Partitioned<T> {
    /// Combine two co-partitioned row sets partition by partition
    ///
    /// Both sides must have been shuffled to the same number of partitions;
    /// a shorter side is padded with empty partitions.
    pub fn try_zip_partitions<U, V, E, F>(
        self,
        other: Partitioned<U>,
        session: &ExecutionSession,
        f: F,
    ) -> Result<Partitioned<V>, E>
    where
        U: Send,
        V: Send,
        E: Send,
        F: Fn(usize, Vec<T>, Vec<U>) -> Result<Vec<V>, E> + Send + Sync,
    {
        let width = self.partitions.len().max(other.partitions.len());
        let mut left = self.partitions;
        let mut right = other.partitions;
        left.resize_with(width, Vec::new);
        right.resize_with(width, Vec::new);

        let partitions = session.install(|| {
            left.into_par_iter()
                .zip(right.into_par_iter())
                .enumerate()
                .map(|(index, (left, right))| f(index, left, right))
                .collect::<Result<Vec<_>, E>>()
        })?;
        Ok(Partitioned { partitions })
    }
}

/// Partition index for a key
///
/// Uses `DefaultHasher` with its fixed keys: stable within a process and
/// across runs of the same build, but the algorithm may change between Rust
/// releases, so assignments must not be persisted or compared across
/// toolchains.
pub fn partition_for<K: Hash + ?Sized>(key: &K, num_partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % num_partitions.max(1) as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ExecutionSession {
        ExecutionSession::local(4).unwrap()
    }

    #[test]
    fn test_map_partitions_keeps_partition_order() {
        let data = Partitioned::new(vec![vec![1, 2], vec![3], vec![4, 5, 6]]);
        let mapped = data.map_partitions(&session(), |index, rows| {
            rows.into_iter().map(|v| (index, v * 10)).collect()
        });
        assert_eq!(
            mapped.into_rows(),
            vec![(0, 10), (0, 20), (1, 30), (2, 40), (2, 50), (2, 60)]
        );
    }

    #[test]
    fn test_try_map_partitions_propagates_error() {
        let data = Partitioned::new(vec![vec![1], vec![2]]);
        let result: Result<Partitioned<i32>, String> =
            data.try_map_partitions(&session(), |index, rows| {
                if index == 1 {
                    Err("boom".to_string())
                } else {
                    Ok(rows)
                }
            });
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    fn test_filter_map_keeps_partitioning() {
        let data = Partitioned::new(vec![vec![1, 2, 3], vec![4, 5]]);
        let evens = data.filter_map(&session(), |v| (v % 2 == 0).then_some(v * 100));
        assert_eq!(evens.partitions(), &[vec![200], vec![400]]);
    }

    #[test]
    fn test_zip_partitions_pads_shorter_side() {
        let left = Partitioned::new(vec![vec!["a"], vec!["b"], vec!["c"]]);
        let right = Partitioned::new(vec![vec![1], vec![2]]);
        let zipped: Partitioned<(usize, usize, usize)> = left
            .try_zip_partitions(right, &session(), |index, l, r| {
                Ok::<_, ()>(vec![(index, l.len(), r.len())])
            })
            .unwrap();
        assert_eq!(zipped.into_rows(), vec![(0, 1, 1), (1, 1, 1), (2, 1, 0)]);
    }

    #[test]
    fn test_repartition_collocates_equal_keys() {
        let rows: Vec<(String, usize)> = (0..200).map(|i| (format!("key{}", i % 17), i)).collect();
        let data = Partitioned::new(vec![rows[..90].to_vec(), rows[90..].to_vec()]);

        let shuffled = data.repartition_by(&session(), 5, |(key, _)| key.clone());
        assert_eq!(shuffled.num_partitions(), 5);
        assert_eq!(shuffled.len(), 200);

        for (index, partition) in shuffled.partitions().iter().enumerate() {
            for (key, _) in partition {
                assert_eq!(partition_for(key, 5), index);
            }
            // original relative order survives the shuffle
            let positions: Vec<usize> = partition.iter().map(|(_, i)| *i).collect();
            let mut sorted = positions.clone();
            sorted.sort_unstable();
            assert_eq!(positions, sorted);
        }
    }

    #[test]
    fn test_repartition_is_deterministic() {
        let make = || Partitioned::single((0..50).collect::<Vec<u32>>());
        let first = make().repartition_by(&session(), 3, |v| *v);
        let second = make().repartition_by(&session(), 3, |v| *v);
        assert_eq!(first, second);
    }
}
