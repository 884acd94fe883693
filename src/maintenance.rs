use std::cmp;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crossbeam_channel::unbounded;
use log::{info, warn};
use threadpool::ThreadPool;

use crate::config::MaintenanceConfig;
use crate::database::{Database, MaintenanceOp};

/// The step at which a file's maintenance sequence stopped, with the
/// engine's explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub op: MaintenanceOp,
    pub message: String,
}

/// Terminal state of one file's unit of work, collected at the join barrier.
#[derive(Debug)]
pub struct FileOutcome {
    pub db_path: PathBuf,
    pub result: Result<(), StepFailure>,
}

/// Runs the compact → analyze → rebuild-indexes routine against every
/// database file directly inside the maintenance directory.
///
/// One unit of work per file, dispatched onto a bounded worker pool; the
/// call blocks until every unit has reached a terminal state. Failures are
/// isolated per file and reported in the returned outcomes — a non-empty
/// return says an attempt was made, not that the databases are healthy.
pub fn run_maintenance(config: &MaintenanceConfig) -> Vec<FileOutcome> {
    info!(
        "starting database maintenance in {}",
        config.db_dir.display()
    );

    let db_files = discover_db_files(&config.db_dir, &config.extension);
    if db_files.is_empty() {
        info!("no database files found; nothing to maintain");
        return Vec::new();
    }

    let num_threads = cmp::min(db_files.len(), config.threads());
    let pool = ThreadPool::new(num_threads);
    let (sender, receiver) = unbounded::<FileOutcome>();

    for db_path in db_files {
        let sender = sender.clone();
        pool.execute(move || {
            let result = service_file(&db_path);
            // The receiver outlives the pool join, so send cannot fail
            sender
                .send(FileOutcome { db_path, result })
                .expect("Failed to send maintenance outcome");
        });
    }

    // Drop the orchestrator's sender so the channel closes once the last
    // worker finishes, then wait out the barrier.
    drop(sender);
    pool.join();

    let outcomes: Vec<FileOutcome> = receiver.try_iter().collect();
    let failures = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(
        "finished database maintenance: {} file(s), {} with errors",
        outcomes.len(),
        failures
    );

    outcomes
}

/// Runs the three maintenance ops in their mandatory order against one
/// file. Each op gets a fresh engine handle. The first failing op ends the
/// sequence for this file; later steps assume the state its predecessor
/// left behind and must not run after a failure.
fn service_file(db_path: &Path) -> Result<(), StepFailure> {
    for op in MaintenanceOp::SEQUENCE {
        info!("running {} on {}", op, db_path.display());

        let step = Database::open(db_path).and_then(|db| db.execute_op(op));
        if let Err(err) = step {
            warn!("{} failed on {}: {}", op, db_path.display(), err);
            return Err(StepFailure {
                op,
                message: err.to_string(),
            });
        }
    }
    Ok(())
}

/// Non-recursive scan of the maintenance directory. The set is fixed for
/// the run; files appearing afterwards are picked up next start. Sorted so
/// dispatch order (and logs) are deterministic.
fn discover_db_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                "cannot read maintenance directory {}: {}",
                dir.display(),
                err
            );
            return Vec::new();
        }
    };

    let mut db_files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(OsStr::to_str) == Some(extension)
        })
        .collect();

    db_files.sort();
    db_files
}
