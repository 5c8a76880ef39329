//! Data-folder housekeeping for downloaded payloads.
//!
//! Both passes only touch `*.csv` files directly inside the folder and
//! always spare the master equity list. Failures are logged and skipped.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn same_name(path: &Path, name: &str) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .map(|n| n.eq_ignore_ascii_case(name))
        .unwrap_or(false)
}

fn csv_files(folder: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list data folder {}: {}", folder.display(), e);
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_csv(path))
        .collect()
}

fn remove(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Deleted {}", path.display());
            true
        }
        Err(e) => {
            warn!("Could not delete {}: {}", path.display(), e);
            false
        }
    }
}

/// Delete every payload except `current` and the master list.
pub fn remove_stale_payloads(folder: &Path, current: &Path, master_list: &str) -> usize {
    let current_name = current
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or_default();

    csv_files(folder)
        .iter()
        .filter(|path| !same_name(path, master_list))
        .filter(|path| current_name.is_empty() || !same_name(path, current_name))
        .filter(|path| remove(path))
        .count()
}

/// Delete payloads whose modification time is older than `max_age`.
pub fn cleanup_old_files(folder: &Path, max_age: Duration, master_list: &str) -> usize {
    let now = SystemTime::now();

    csv_files(folder)
        .iter()
        .filter(|path| !same_name(path, master_list))
        .filter(|path| {
            std::fs::metadata(path)
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .map(|age| age > max_age)
                .unwrap_or(false)
        })
        .filter(|path| remove(path))
        .count()
}
