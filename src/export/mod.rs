//! Table export
//!
//! Persists star-schema tables as partitioned Parquet datasets:
//! - Arrow schemas and record batch conversion per table
//! - Hive-style partition directories with path escaping
//! - Whole-table overwrite through a staging directory

pub mod error;
pub mod schema;
pub mod writer;

pub use error::ExportError;
pub use schema::{TIMESTAMP_TZ, TableRow};
pub use writer::{
    ARTISTS_TABLE, DEFAULT_PARTITION, SONGPLAYS_TABLE, SONGS_TABLE, SUCCESS_MARKER, TABLES_DIR,
    TIMES_TABLE, TableSpec, TableWriteStats, TableWriter, USERS_TABLE, WritableTable,
    escape_path_name, partition_segment,
};
