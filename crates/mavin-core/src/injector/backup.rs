//! Versioned backups under `<ModelFolder>/DL_VERSION`.
//!
//! Each injection snapshots the whole source folder into
//! `DL_VERSION/<SourceFolderName>`, or the first free `<SourceFolderName>_N`.
//! Slot allocation runs under a lock file in `DL_VERSION` so two runs against
//! the same model folder cannot claim the same slot.

use crate::cancel::CancelToken;
use crate::error::Error;
use crate::injector::copier::{self, CopyPlan};
use crate::injector::paths::{dl_version_dir, folder_name};
use crate::progress::ProgressReporter;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const LOCK_FILE_NAME: &str = ".backup.lock";
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// First path among `name`, `name_1`, `name_2`, ... under `parent` that does
/// not exist yet. Only probes; nothing is created.
pub fn next_backup_path(parent: &Path, name: &str) -> PathBuf {
    let candidate = parent.join(name);
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|i| parent.join(format!("{}_{}", name, i)))
        .find(|c| !c.exists())
        .unwrap_or(candidate)
}

/// Exclusive hold on a `DL_VERSION` directory, released on drop.
#[derive(Debug)]
pub struct BackupSlotLock {
    path: PathBuf,
}

impl BackupSlotLock {
    pub fn acquire(dir: &Path) -> Result<Self, Error> {
        Self::acquire_with_timeout(dir, LOCK_TIMEOUT)
    }

    pub fn acquire_with_timeout(dir: &Path, timeout: Duration) -> Result<Self, Error> {
        let path = dir.join(LOCK_FILE_NAME);
        let start = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    // Built before the write so a failed write still removes the file.
                    let lock = Self { path };
                    writeln!(file, "pid {}", std::process::id())?;
                    debug!("Acquired backup lock {}", lock.path.display());
                    return Ok(lock);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if start.elapsed() >= timeout {
                        return Err(Error::Locked {
                            dir: dir.to_path_buf(),
                            holder: lock_holder(&path),
                        });
                    }
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Contents of an existing lock file, e.g. `pid 4242`.
fn lock_holder(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => format!("empty lock file {}", path.display()),
        Err(e) => format!("unreadable lock file {}: {}", path.display(), e),
    }
}

impl Drop for BackupSlotLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release backup lock {}: {}", self.path.display(), e);
        }
    }
}

/// Claim and create the next free backup folder for `name` under `dl_version`.
pub fn allocate_backup_dir(dl_version: &Path, name: &str) -> Result<PathBuf, Error> {
    fs::create_dir_all(dl_version)?;
    let _lock = BackupSlotLock::acquire(dl_version)?;

    loop {
        let candidate = next_backup_path(dl_version, name);
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

/// Copy the entire source folder into a fresh slot under the model folder's
/// `DL_VERSION`. Returns the backup folder.
pub fn backup_source(
    source: &Path,
    model_folder: &Path,
    reporter: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Result<PathBuf, Error> {
    if !source.is_dir() {
        return Err(Error::SourceNotFound(source.to_path_buf()));
    }
    if !model_folder.is_dir() {
        return Err(Error::TargetNotFound(model_folder.to_path_buf()));
    }

    let start = Instant::now();
    let backup_dir = allocate_backup_dir(&dl_version_dir(model_folder), &folder_name(source))?;
    info!("Backing up {} to {}", source.display(), backup_dir.display());
    reporter.on_backup_start(&backup_dir);

    let plan = CopyPlan::build(source, &backup_dir)?;
    let files = copier::copy_overwrite_only(&plan, &crate::progress::SilentReporter, cancel)?;

    reporter.on_backup_complete(&backup_dir, files, start.elapsed().as_secs_f64());
    Ok(backup_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_next_backup_path_unused_name() {
        let tmp = tempdir().unwrap();
        assert_eq!(next_backup_path(tmp.path(), "Foo"), tmp.path().join("Foo"));
    }

    #[test]
    fn test_next_backup_path_skips_taken_suffixes() {
        let tmp = tempdir().unwrap();
        fs::create_dir(tmp.path().join("Foo")).unwrap();
        fs::create_dir(tmp.path().join("Foo_1")).unwrap();
        assert_eq!(next_backup_path(tmp.path(), "Foo"), tmp.path().join("Foo_2"));
    }

    #[test]
    fn test_next_backup_path_fills_first_gap() {
        let tmp = tempdir().unwrap();
        fs::create_dir(tmp.path().join("Foo")).unwrap();
        fs::create_dir(tmp.path().join("Foo_2")).unwrap();
        assert_eq!(next_backup_path(tmp.path(), "Foo"), tmp.path().join("Foo_1"));
    }

    #[test]
    fn test_allocate_creates_successive_slots_and_releases_lock() {
        let tmp = tempdir().unwrap();
        let dl_version = tmp.path().join("DL_VERSION");

        let first = allocate_backup_dir(&dl_version, "Model_A").unwrap();
        let second = allocate_backup_dir(&dl_version, "Model_A").unwrap();
        assert_eq!(first, dl_version.join("Model_A"));
        assert_eq!(second, dl_version.join("Model_A_1"));
        assert!(first.is_dir() && second.is_dir());
        assert!(!dl_version.join(LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_lock_held_elsewhere_times_out() {
        let tmp = tempdir().unwrap();
        let held = BackupSlotLock::acquire(tmp.path()).unwrap();
        assert!(held.path().exists());

        let second = BackupSlotLock::acquire_with_timeout(tmp.path(), Duration::from_millis(250));
        match second {
            Err(Error::Locked { dir, holder }) => {
                assert_eq!(dir, tmp.path());
                assert_eq!(holder, format!("pid {}", std::process::id()));
            }
            other => panic!("Expected a lock timeout, got {:?}", other),
        }

        drop(held);
        assert!(BackupSlotLock::acquire(tmp.path()).is_ok());
    }
}
