use std::path::Path;

/// Trait for reporting injection and search progress.
///
/// The CLI implements it with indicatif bars. All methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    fn on_backup_start(&self, _backup_dir: &Path) {}
    fn on_backup_complete(&self, _backup_dir: &Path, _files: usize, _duration_secs: f64) {}
    fn on_copy_start(&self, _total_files: usize) {}
    fn on_file_copied(&self, _copied: usize, _total_files: usize, _relative: &Path) {}
    fn on_copy_complete(&self, _copied: usize, _duration_secs: f64) {}
    fn on_host_start(&self, _key: &str, _ip: &str) {}
    fn on_host_complete(&self, _key: &str, _succeeded: bool, _detail: &str) {}
    fn on_search_start(&self, _cells: usize, _slots: usize) {}
    fn on_cell_searched(&self, _done: usize, _total: usize, _cell_id: &str, _matches: usize) {}
    fn on_search_complete(&self, _found: usize, _total_cells: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
