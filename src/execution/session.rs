//! Execution session handle
//!
//! The session owns the worker pool every partitioned transform runs on and
//! the credentials a storage connector would need. Credentials travel inside
//! the session and are never written to the process environment.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transform::keys::MAX_PARTITIONS;

/// Storage credentials supplied by configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Both halves present and non-empty
    pub fn is_complete(&self) -> bool {
        !self.access_key_id.trim().is_empty() && !self.secret_access_key.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &"<redacted>")
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Parameters for building an [`ExecutionSession`]
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Worker threads (0 = one per available core)
    pub workers: usize,
    /// Number of partitions produced by a shuffle
    pub shuffle_partitions: usize,
    pub credentials: Option<Credentials>,
}

/// Errors that can occur while building a session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid shuffle partition count {0}: expected 1..={max}", max = MAX_PARTITIONS)]
    InvalidPartitions(usize),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A ready-to-use compute session
pub struct ExecutionSession {
    pool: rayon::ThreadPool,
    shuffle_partitions: usize,
    credentials: Option<Credentials>,
}

impl ExecutionSession {
    /// Build a session from its configuration
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        if config.shuffle_partitions == 0 || config.shuffle_partitions > MAX_PARTITIONS {
            return Err(SessionError::InvalidPartitions(config.shuffle_partitions));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|index| format!("songplay-worker-{index}"))
            .build()?;

        tracing::debug!(
            workers = pool.current_num_threads(),
            shuffle_partitions = config.shuffle_partitions,
            credentials = config.credentials.is_some(),
            "Execution session ready"
        );

        Ok(Self {
            pool,
            shuffle_partitions: config.shuffle_partitions,
            credentials: config.credentials,
        })
    }

    /// Session with default workers and the given shuffle width
    pub fn local(shuffle_partitions: usize) -> Result<Self, SessionError> {
        Self::new(SessionConfig {
            shuffle_partitions,
            ..Default::default()
        })
    }

    /// Run `op` inside the session's worker pool
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn shuffle_partitions(&self) -> usize {
        self.shuffle_partitions
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

impl fmt::Debug for ExecutionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionSession")
            .field("workers", &self.workers())
            .field("shuffle_partitions", &self.shuffle_partitions)
            .field("credentials", &self.credentials)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_rejects_zero_partitions() {
        let err = ExecutionSession::local(0).unwrap_err();
        assert!(matches!(err, SessionError::InvalidPartitions(0)));
    }

    #[test]
    fn test_session_with_explicit_workers() {
        let session = ExecutionSession::new(SessionConfig {
            workers: 2,
            shuffle_partitions: 3,
            credentials: Some(Credentials::new("key", "secret")),
        })
        .unwrap();
        assert_eq!(session.workers(), 2);
        assert_eq!(session.shuffle_partitions(), 3);
        assert!(session.credentials().is_some());
        assert_eq!(session.install(|| 21 * 2), 42);
    }

    #[test]
    fn test_credentials_are_redacted() {
        let credentials = Credentials::new("AKIAEXAMPLE", "very-secret");
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("very-secret"));
        assert!(credentials.is_complete());
        assert!(!Credentials::new("key", " ").is_complete());
    }
}
