use crate::cancel::CancelToken;
use crate::error::Error;
use crate::finder::dates::ProbeSlot;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Inspection verdict folder an image folder was filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Ng,
    DlCandidate,
    DlOk,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Ng, Category::DlCandidate, Category::DlOk];

    pub fn relative_path(&self) -> PathBuf {
        match self {
            Category::Ng => PathBuf::from("NG"),
            Category::DlCandidate => Path::new("OK").join("DL_CANDIDATE"),
            Category::DlOk => Path::new("OK").join("DL_OK"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Ng => "NG",
            Category::DlCandidate => r"OK\DL_CANDIDATE",
            Category::DlOk => r"OK\DL_OK",
        };
        f.write_str(label)
    }
}

/// An immediate subfolder of one category directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFolder {
    pub slot: ProbeSlot,
    pub category: Category,
    pub category_dir: PathBuf,
    pub path: PathBuf,
    pub name: String,
}

/// List the image folders under every `<root>/YYYY/MM/DD/HH/<category>`.
///
/// Slots or categories that do not exist are skipped; unreadable ones are
/// logged and skipped. Output follows slot order, then category order, then
/// folder name.
pub fn scan_slots(
    root: &Path,
    slots: &[ProbeSlot],
    cancel: &CancelToken,
) -> Result<Vec<ScannedFolder>, Error> {
    let mut folders = Vec::new();

    for slot in slots {
        cancel.check()?;
        let hour_dir = root.join(slot.relative_path());
        if !hour_dir.is_dir() {
            continue;
        }
        for category in Category::ALL {
            let category_dir = hour_dir.join(category.relative_path());
            let mut found = list_subfolders(&category_dir)?
                .into_iter()
                .map(|(path, name)| ScannedFolder {
                    slot: *slot,
                    category,
                    category_dir: category_dir.clone(),
                    path,
                    name,
                })
                .collect::<Vec<_>>();
            debug!("{}: {} folders", category_dir.display(), found.len());
            folders.append(&mut found);
        }
    }

    Ok(folders)
}

fn list_subfolders(dir: &Path) -> Result<Vec<(PathBuf, String)>, Error> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            error!("Access denied reading directory {}: {}", dir.display(), err);
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(Error::Io(io::Error::new(
                err.kind(),
                format!("Error reading directory {}: {}", dir.display(), err),
            )))
        }
    };

    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            Error::Io(io::Error::new(
                err.kind(),
                format!("Error reading entry in directory {}: {}", dir.display(), err),
            ))
        })?;
        let path = entry.path();
        if path.is_dir() {
            folders.push((path, entry.file_name().to_string_lossy().into_owned()));
        }
    }
    folders.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn slot(hour: u8) -> ProbeSlot {
        ProbeSlot {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            hour,
        }
    }

    #[test]
    fn test_scan_lists_all_categories_and_skips_missing_hours() {
        let tmp = tempdir().unwrap();
        let hour_dir = tmp.path().join(slot(12).relative_path());
        for category in Category::ALL {
            fs::create_dir_all(hour_dir.join(category.relative_path()).join(format!(
                "20240101_120000_{:?}",
                category
            )))
            .unwrap();
        }
        fs::write(hour_dir.join("NG").join("stray.txt"), "not a folder").unwrap();

        let folders = scan_slots(tmp.path(), &[slot(11), slot(12)], &CancelToken::new()).unwrap();
        let categories: Vec<Category> = folders.iter().map(|f| f.category).collect();
        assert_eq!(categories, Category::ALL.to_vec());
        assert!(folders.iter().all(|f| f.slot == slot(12)));
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::Ng.to_string(), "NG");
        assert_eq!(Category::DlCandidate.to_string(), r"OK\DL_CANDIDATE");
        assert_eq!(Category::DlOk.relative_path(), Path::new("OK").join("DL_OK"));
    }
}
