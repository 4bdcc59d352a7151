//! Per-handle options, fixed at initialize time.

use dbsync_core::diff::SnapshotMode;
use dbsync_core::model::{DbEngineType, HostType};
use dbsync_core::schema::MissingColumnPolicy;
use dbsync_store::ConnectionOptions;
use std::time::Duration;

/// Behaviour of one synchronized table handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// How long a write waits for a lock held by another connection
    pub busy_timeout: Duration,
    /// Meaning of a non-key column omitted from a payload row
    pub missing_columns: MissingColumnPolicy,
    /// Default snapshot semantics for `update_snapshot_data`
    pub snapshot_mode: SnapshotMode,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            missing_columns: MissingColumnPolicy::Null,
            snapshot_mode: SnapshotMode::Full,
        }
    }
}

impl SyncOptions {
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn with_missing_columns(mut self, policy: MissingColumnPolicy) -> Self {
        self.missing_columns = policy;
        self
    }

    pub fn with_snapshot_mode(mut self, mode: SnapshotMode) -> Self {
        self.snapshot_mode = mode;
        self
    }

    pub(crate) fn connection_options(&self, host: HostType, engine: DbEngineType) -> ConnectionOptions {
        ConnectionOptions {
            engine,
            host,
            busy_timeout: self.busy_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SyncOptions::default();
        assert_eq!(options.busy_timeout, Duration::from_secs(5));
        assert_eq!(options.missing_columns, MissingColumnPolicy::Null);
        assert_eq!(options.snapshot_mode, SnapshotMode::Full);
    }

    #[test]
    fn test_builder_and_connection_options() {
        let options = SyncOptions::default()
            .with_busy_timeout(Duration::from_millis(10))
            .with_missing_columns(MissingColumnPolicy::KeepPrevious)
            .with_snapshot_mode(SnapshotMode::Partial);
        assert_eq!(options.snapshot_mode, SnapshotMode::Partial);

        let conn = options.connection_options(HostType::Manager, DbEngineType::InMemory);
        assert_eq!(conn.busy_timeout, Duration::from_millis(10));
        assert_eq!(conn.host, HostType::Manager);
        assert_eq!(conn.engine, DbEngineType::InMemory);
    }
}
