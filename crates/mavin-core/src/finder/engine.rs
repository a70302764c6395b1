use crate::cancel::CancelToken;
use crate::error::Error;
use crate::finder::dates::DateSelector;
use crate::finder::matcher::{IdMatcher, MatchCandidate};
use crate::finder::resolver;
use crate::finder::scanner;
use crate::injector::copier;
use crate::progress::ProgressReporter;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// `<Drive>:\<SubPath>`, e.g. `E:\Files\Image\JF2`.
pub fn search_root(drive: &str, sub_path: &str) -> PathBuf {
    let letter = drive.trim().trim_end_matches(':').to_uppercase();
    let letter = if letter.is_empty() { "E".to_string() } else { letter };
    PathBuf::from(format!("{}:\\", letter)).join(sub_path.trim().trim_start_matches(['\\', '/']))
}

#[derive(Debug, Clone)]
pub struct FindRequest {
    pub root: PathBuf,
    pub dates: DateSelector,
    pub cell_ids: Vec<String>,
    pub latest_only: bool,
    /// Copy the selected images into `<dir>/<cell_id>/`.
    pub copy_to: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Found,
    NotFound,
}

impl CellStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellStatus::Found => "FOUND",
            CellStatus::NotFound => "NOT FOUND",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CellResult {
    pub cell_id: String,
    pub status: CellStatus,
    /// Candidates seen before resolution.
    pub match_count: usize,
    pub selected: Vec<MatchCandidate>,
    pub copied: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct FindReport {
    pub root: PathBuf,
    pub days: usize,
    pub slots: usize,
    pub folders_scanned: usize,
    pub results: Vec<CellResult>,
    pub duration: Duration,
}

impl FindReport {
    pub fn found(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == CellStatus::Found)
            .count()
    }
}

pub struct FindEngine<'a> {
    reporter: &'a dyn ProgressReporter,
    cancel: CancelToken,
}

impl<'a> FindEngine<'a> {
    pub fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            reporter,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Search every requested cell ID:
    /// 1. Expand the date selection into hour slots
    /// 2. List the category folders of every slot once
    /// 3. Match and resolve per cell, copying images when asked
    pub fn run(&self, request: &FindRequest) -> Result<FindReport, Error> {
        let start = Instant::now();
        if !request.root.is_dir() {
            return Err(Error::SearchRootNotFound(request.root.clone()));
        }

        let days = request.dates.dates()?.len();
        let slots = request.dates.expand()?;
        info!("Base: {}", request.root.display());
        info!("Dates: {} day(s)", days);
        info!("Cells: {}", request.cell_ids.len());
        self.reporter.on_search_start(request.cell_ids.len(), slots.len());

        if let Some(out) = &request.copy_to {
            fs::create_dir_all(out)?;
            info!("Copy output: {}", out.display());
        }

        let folders = scanner::scan_slots(&request.root, &slots, &self.cancel)?;
        debug!("{} image folders across {} slots", folders.len(), slots.len());

        let total = request.cell_ids.len();
        let mut results = Vec::with_capacity(total);
        for (i, cell_id) in request.cell_ids.iter().enumerate() {
            self.cancel.check()?;
            let candidates = IdMatcher::new(cell_id).match_folders(&folders);
            let match_count = candidates.len();
            let selected = resolver::resolve(candidates, request.latest_only);

            let copied = match &request.copy_to {
                Some(out) => copy_images(&selected, out, cell_id)?,
                None => Vec::new(),
            };

            let status = if selected.is_empty() {
                CellStatus::NotFound
            } else {
                CellStatus::Found
            };
            debug!("{}: {} ({} matches)", cell_id, status.as_str(), match_count);
            self.reporter.on_cell_searched(i + 1, total, cell_id, match_count);

            results.push(CellResult {
                cell_id: cell_id.clone(),
                status,
                match_count,
                selected,
                copied,
            });
        }

        let report = FindReport {
            root: request.root.clone(),
            days,
            slots: slots.len(),
            folders_scanned: folders.len(),
            results,
            duration: start.elapsed(),
        };
        self.reporter
            .on_search_complete(report.found(), total, report.duration.as_secs_f64());
        info!("Found {}/{} cells", report.found(), total);
        Ok(report)
    }
}

/// Copy each candidate's images into `<out>/<cell_id>/`, keeping file names.
pub fn copy_images(
    candidates: &[MatchCandidate],
    out: &Path,
    cell_id: &str,
) -> Result<Vec<PathBuf>, Error> {
    let images: Vec<&PathBuf> = candidates
        .iter()
        .flat_map(|c| [c.img0.as_ref(), c.img1.as_ref()])
        .flatten()
        .collect();
    if images.is_empty() {
        return Ok(Vec::new());
    }

    let dest_dir = out.join(cell_id);
    fs::create_dir_all(&dest_dir)?;

    let mut copied = Vec::with_capacity(images.len());
    for src in images {
        let Some(name) = src.file_name() else { continue };
        let dest = dest_dir.join(name);
        copier::copy_file(src, &dest)?;
        copied.push(dest);
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(windows)]
    #[test]
    fn test_search_root_from_drive() {
        assert_eq!(
            search_root("e:", r"\Files\Image\JF2"),
            PathBuf::from(r"E:\Files\Image\JF2")
        );
    }

    #[test]
    fn test_search_root_defaults_drive() {
        let root = search_root(" ", "JF2");
        assert!(root.to_string_lossy().starts_with("E:"));
        assert!(root.to_string_lossy().ends_with("JF2"));
    }
}
