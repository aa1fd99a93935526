//! Source locations and layout patterns

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default layout of catalog song records under the input location
pub const SONG_DATA_PATTERN: &str = "song_data/*/*/*/*.json";

/// Default layout of activity log events under the input location
pub const LOG_DATA_PATTERN: &str = "log_data/*/*/*.json";

const REMOTE_SCHEMES: &[&str] = &["s3://", "s3a://", "s3n://", "gs://", "abfs://", "hdfs://"];

/// Where raw sources live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceLocation {
    /// Local filesystem path
    Local(PathBuf),
    /// Object-store URL; reading one requires an external connector
    Remote(String),
}

impl SourceLocation {
    /// Parse a location string
    ///
    /// Supported formats:
    /// - Local: `./path`, `/path`, `path`
    /// - Remote: `s3://bucket/prefix`, `s3a://…`, `gs://…`, `abfs://…`, `hdfs://…`
    pub fn parse(location: &str) -> Self {
        if REMOTE_SCHEMES.iter().any(|scheme| location.starts_with(scheme)) {
            SourceLocation::Remote(location.to_string())
        } else {
            SourceLocation::Local(PathBuf::from(location))
        }
    }

    /// Local path, if this is a local location
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            SourceLocation::Local(path) => Some(path),
            SourceLocation::Remote(_) => None,
        }
    }

    /// Get a display string for this location
    pub fn display(&self) -> String {
        match self {
            SourceLocation::Local(path) => path.display().to_string(),
            SourceLocation::Remote(url) => url.clone(),
        }
    }
}
