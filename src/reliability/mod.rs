//! Reliability layer
//!
//! States of one write:
//!
//! ```text
//! NoBackup -> Backed-up -> Written -> Verified            (success)
//!             Backed-up -> WriteFailed | VerifyFailed -> Restored
//! ```

mod backup;
mod writer;

use std::time::Duration;

pub use backup::BackupStore;
pub use writer::{ReliableWriter, WriteOptions, WriteOutcome};

/// Name of the backup directory created next to destinations
pub const BACKUP_DIR_NAME: &str = ".templater_backups";

/// Default age after which backups are pruned
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);
