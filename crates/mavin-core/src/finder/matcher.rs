use crate::finder::dates::ProbeSlot;
use crate::finder::scanner::{Category, ScannedFolder};
use chrono::NaiveDateTime;
use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

const TIMESTAMP_LEN: usize = 15;
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// How much of the expected image pair a matched folder holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Completeness {
    FolderOnly,
    Partial,
    Full,
}

impl Completeness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Completeness::FolderOnly => "FOLDER ONLY",
            Completeness::Partial => "PARTIAL",
            Completeness::Full => "FULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub cell_id: String,
    pub slot: ProbeSlot,
    pub category: Category,
    pub category_dir: PathBuf,
    pub folder: PathBuf,
    pub folder_name: String,
    /// `YYYYMMDD_HHMMSS` from the folder name, empty when absent or not a
    /// real date and time.
    pub timestamp_key: String,
    pub img0: Option<PathBuf>,
    pub img1: Option<PathBuf>,
}

impl MatchCandidate {
    pub fn completeness(&self) -> Completeness {
        match (self.img0.is_some(), self.img1.is_some()) {
            (true, true) => Completeness::Full,
            (false, false) => Completeness::FolderOnly,
            _ => Completeness::Partial,
        }
    }

    pub fn has_images(&self) -> bool {
        self.completeness() != Completeness::FolderOnly
    }

    pub fn sort_key(&self) -> (&str, &str) {
        (&self.timestamp_key, &self.folder_name)
    }

    /// `YYYYMMDD` of the embedded timestamp.
    pub fn chosen_date(&self) -> &str {
        self.timestamp_key.get(..8).unwrap_or("")
    }
}

/// Matches folders and images for one cell ID.
pub struct IdMatcher {
    cell_id: String,
    needle: String,
    img0: Option<Pattern>,
    img1: Option<Pattern>,
}

impl IdMatcher {
    pub fn new(cell_id: &str) -> Self {
        let escaped = Pattern::escape(cell_id);
        let compile = |suffix: &str| {
            let glob = format!("*_{}_EXT_DL_{}.jpg", escaped, suffix);
            Pattern::new(&glob)
                .map_err(|e| error!("Invalid glob pattern '{}': {}", glob, e))
                .ok()
        };
        Self {
            cell_id: cell_id.to_string(),
            needle: format!("_{}", cell_id),
            img0: compile("0_2"),
            img1: compile("1_2"),
        }
    }

    pub fn cell_id(&self) -> &str {
        &self.cell_id
    }

    pub fn folder_matches(&self, folder_name: &str) -> bool {
        folder_name.contains(&self.needle)
    }

    /// Candidates for every scanned folder whose name carries this cell ID.
    pub fn match_folders(&self, folders: &[ScannedFolder]) -> Vec<MatchCandidate> {
        folders
            .iter()
            .filter(|f| self.folder_matches(&f.name))
            .map(|f| self.candidate(f))
            .collect()
    }

    fn candidate(&self, folder: &ScannedFolder) -> MatchCandidate {
        let (img0, img1) = self.find_images(&folder.path);
        let timestamp_key = extract_timestamp_key(&folder.name);
        MatchCandidate {
            cell_id: self.cell_id.clone(),
            slot: folder.slot,
            category: folder.category,
            category_dir: folder.category_dir.clone(),
            folder: folder.path.clone(),
            folder_name: folder.name.clone(),
            timestamp_key,
            img0,
            img1,
        }
    }

    /// First `_DL_0_2` and `_DL_1_2` images in the folder, by file name.
    pub fn find_images(&self, folder: &Path) -> (Option<PathBuf>, Option<PathBuf>) {
        let mut names: Vec<PathBuf> = match fs::read_dir(folder) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(e) => {
                warn!("Cannot list {}: {}", folder.display(), e);
                return (None, None);
            }
        };
        names.sort();

        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };
        let first = |pattern: &Option<Pattern>| {
            let pattern = pattern.as_ref()?;
            names
                .iter()
                .find(|p| {
                    p.file_name()
                        .map(|n| pattern.matches_with(&n.to_string_lossy(), options))
                        .unwrap_or(false)
                })
                .cloned()
        };
        (first(&self.img0), first(&self.img1))
    }
}

/// `YYYYMMDD_HHMMSS` prefix of a folder name such as
/// `20260117_152731_8A7EL155K1_h5CMK04138`. Empty when absent, or when the
/// digits do not form a valid date and time.
pub fn extract_timestamp_key(folder_name: &str) -> String {
    let bytes = folder_name.as_bytes();
    if bytes.len() <= TIMESTAMP_LEN || bytes[TIMESTAMP_LEN] != b'_' {
        return String::new();
    }
    let shape_ok = bytes[..TIMESTAMP_LEN].iter().enumerate().all(|(i, b)| {
        if i == 8 {
            *b == b'_'
        } else {
            b.is_ascii_digit()
        }
    });
    let key = &folder_name[..TIMESTAMP_LEN];
    if shape_ok && NaiveDateTime::parse_from_str(key, TIMESTAMP_FORMAT).is_ok() {
        key.to_string()
    } else {
        String::new()
    }
}

/// Split cell IDs on whitespace or commas, dropping repeats but keeping order.
pub fn normalize_cell_ids(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    text.split(|c: char| c.is_whitespace() || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}
