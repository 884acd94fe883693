use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::DevicesConfig;

/// Result of one attempted permission change, for callers that want to
/// inspect the pass after the fact. Logging is the primary surface.
#[derive(Debug)]
pub struct DeviceOutcome {
    pub path: PathBuf,
    pub result: Result<(), String>,
}

/// Walks the device tree once, depth-first, and sets world read/write on
/// every non-directory entry whose path (relative to the root) starts with
/// one of the configured accelerator prefixes. Entries outside the
/// allow-list are never touched. Best-effort throughout: a failed chmod or
/// an unreadable subtree is logged and the walk continues.
pub fn normalize_devices(config: &DevicesConfig) -> Vec<DeviceOutcome> {
    if !cfg!(unix) {
        info!("device permission pass skipped: not supported on this platform");
        return Vec::new();
    }

    info!(
        "normalizing device permissions under {}",
        config.root.display()
    );

    let mut outcomes = Vec::new();
    visit_dir(&config.root, &config.root, &config.prefixes, &mut outcomes);
    outcomes
}

fn visit_dir(
    root: &Path,
    dir: &Path,
    prefixes: &[String],
    outcomes: &mut Vec<DeviceOutcome>,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot read device directory {}: {}", dir.display(), err);
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("cannot read device entry under {}: {}", dir.display(), err);
                continue;
            }
        };

        let path = entry.path();
        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);

        if is_dir {
            visit_dir(root, &path, prefixes, outcomes);
            continue;
        }

        if !matches_prefix(root, &path, prefixes) {
            continue;
        }

        match set_world_rw(&path) {
            Ok(()) => {
                info!("chmod 666 {}", path.display());
                outcomes.push(DeviceOutcome {
                    path,
                    result: Ok(()),
                });
            }
            Err(err) => {
                warn!("failed to chmod {}: {}", path.display(), err);
                outcomes.push(DeviceOutcome {
                    path,
                    result: Err(err.to_string()),
                });
            }
        }
    }
}

/// Textual prefix match on the path relative to the device root, so the
/// allow-list stays valid when the root is injected in tests.
fn matches_prefix(root: &Path, path: &Path, prefixes: &[String]) -> bool {
    let relative = match path.strip_prefix(root) {
        Ok(relative) => relative,
        Err(_) => return false,
    };
    let relative = relative.to_string_lossy();
    prefixes.iter().any(|prefix| relative.starts_with(prefix.as_str()))
}

#[cfg(unix)]
fn set_world_rw(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o666))
}

#[cfg(not(unix))]
fn set_world_rw(_path: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "permission modes are not supported on this platform",
    ))
}
