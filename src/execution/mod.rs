//! Partitioned execution
//!
//! An explicitly passed [`ExecutionSession`] replaces any global execution
//! context, and [`Partitioned`] row sets carry data between transforms.

mod partitioned;
mod session;

pub use partitioned::{Partitioned, partition_for};
pub use session::{Credentials, ExecutionSession, SessionConfig, SessionError};
