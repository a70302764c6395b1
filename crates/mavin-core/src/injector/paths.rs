use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub const DL_VERSION_DIRNAME: &str = "DL_VERSION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavinRoot {
    pub path: PathBuf,
    /// True when found by a case-insensitive scan of the default's parent.
    pub discovered: bool,
}

/// Find the local MAVIN folder. The default path wins when it exists;
/// otherwise its parent is scanned for a child named `mavin` in any casing.
pub fn locate_mavin_root(default: &Path) -> Option<MavinRoot> {
    if default.is_dir() {
        return Some(MavinRoot {
            path: default.to_path_buf(),
            discovered: false,
        });
    }

    let parent = default.parent()?;
    let wanted = default.file_name()?.to_string_lossy().to_lowercase();
    let entries = fs::read_dir(parent).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() && entry.file_name().to_string_lossy().to_lowercase() == wanted {
            debug!("Discovered MAVIN root at {}", path.display());
            return Some(MavinRoot {
                path,
                discovered: true,
            });
        }
    }
    None
}

/// Immediate subdirectories of a MAVIN root, `Model_*` first, then by lowercase name.
pub fn list_model_folders(mavin_root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(mavin_root)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort_by_key(|p| {
        let name = folder_name(p).to_lowercase();
        (!name.starts_with("model_"), name)
    });
    Ok(dirs)
}

/// Model folders keyed by lowercase name.
pub fn model_map(mavin_root: &Path) -> io::Result<BTreeMap<String, PathBuf>> {
    Ok(list_model_folders(mavin_root)?
        .into_iter()
        .map(|p| (folder_name(&p).to_lowercase(), p))
        .collect())
}

pub fn dl_version_dir(model_folder: &Path) -> PathBuf {
    model_folder.join(DL_VERSION_DIRNAME)
}

pub fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Render a relative path with backslash separators, as the vision PCs show it.
pub fn display_relative(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\\")
}
