use std::fmt;
use std::path::Path;

use rusqlite::Connection;

use crate::error::MediaLaunchError;

/// One step of the fixed per-file maintenance routine.
///
/// Each step assumes the database is in the consistent state left by its
/// predecessor, which is why `SEQUENCE` is ordered and must not be reshuffled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceOp {
    Compact,
    Analyze,
    RebuildIndexes,
}

impl MaintenanceOp {
    /// The full routine, in mandatory execution order.
    pub const SEQUENCE: [MaintenanceOp; 3] = [
        MaintenanceOp::Compact,
        MaintenanceOp::Analyze,
        MaintenanceOp::RebuildIndexes,
    ];

    pub fn sql(&self) -> &'static str {
        match self {
            MaintenanceOp::Compact => "VACUUM",
            MaintenanceOp::Analyze => "ANALYZE",
            MaintenanceOp::RebuildIndexes => "REINDEX",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MaintenanceOp::Compact => "compact",
            MaintenanceOp::Analyze => "analyze",
            MaintenanceOp::RebuildIndexes => "rebuild-indexes",
        }
    }
}

impl fmt::Display for MaintenanceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Narrow handle onto the embedded database engine.
///
/// The entrypoint only ever needs "open file, run one statement, close" —
/// each maintenance op gets its own short-lived connection so a wedged
/// statement can't hold a handle across steps.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self, MediaLaunchError> {
        let conn = Connection::open(db_path)?;
        Ok(Self { conn })
    }

    /// Run a single maintenance statement to completion. The connection is
    /// closed when the `Database` is dropped.
    pub fn execute_op(&self, op: MaintenanceOp) -> Result<(), MediaLaunchError> {
        self.conn.execute_batch(op.sql())?;
        Ok(())
    }
}
