use indicatif::{ProgressBar, ProgressStyle};
use mavin_core::ProgressReporter;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Backup phase: spinner
/// - Copy phase: progress bar (file count known from the plan)
/// - Search phase: progress bar over cell IDs
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }

    fn spinner(message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICK_CHARS));
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn bar(total: usize, template: &str) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(template) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

impl ProgressReporter for CliReporter {
    fn on_backup_start(&self, backup_dir: &Path) {
        self.set_bar(Self::spinner(format!("Backing up to {}...", backup_dir.display())));
    }

    fn on_backup_complete(&self, backup_dir: &Path, files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Backup complete: {} files to {} in {:.2}s",
            files,
            backup_dir.display(),
            duration_secs
        );
    }

    fn on_copy_start(&self, total_files: usize) {
        self.set_bar(Self::bar(
            total_files,
            "  {spinner:.cyan} Copying [{bar:30.cyan/dim}] {pos}/{len} files {msg}",
        ));
    }

    fn on_file_copied(&self, copied: usize, _total_files: usize, relative: &Path) {
        self.with_bar(|pb| {
            pb.set_position(copied as u64);
            pb.set_message(relative.display().to_string());
        });
    }

    fn on_copy_complete(&self, copied: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Copy complete: {} files in {:.2}s",
            copied, duration_secs
        );
    }

    fn on_host_start(&self, key: &str, ip: &str) {
        eprintln!("  → {} ({})", key, ip);
    }

    fn on_host_complete(&self, key: &str, succeeded: bool, detail: &str) {
        self.finish_bar();
        if succeeded {
            eprintln!("  \x1b[32m✓\x1b[0m {}: {}", key, detail);
        } else {
            eprintln!("  \x1b[31m✗\x1b[0m {}: {}", key, detail);
        }
    }

    fn on_search_start(&self, cells: usize, slots: usize) {
        let pb = Self::bar(
            cells,
            "  {spinner:.cyan} Searching [{bar:30.cyan/dim}] {pos}/{len} cells {msg}",
        );
        pb.set_message(format!("({} hour folders)", slots));
        self.set_bar(pb);
    }

    fn on_cell_searched(&self, done: usize, _total_cells: usize, cell_id: &str, _matches: usize) {
        self.with_bar(|pb| {
            pb.set_position(done as u64);
            pb.set_message(cell_id.to_string());
        });
    }

    fn on_search_complete(&self, found: usize, total_cells: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Search complete: {}/{} cells found in {:.2}s",
            found, total_cells, duration_secs
        );
    }
}
