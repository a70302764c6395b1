use crate::error::Error;
use crate::injector::paths::{display_relative, dl_version_dir};
use chrono::{DateTime, Local};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MARKER_PREFIX: &str = "_INJECT_DRY_RUN_";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Everything an injection would do, written out instead of doing it.
#[derive(Debug, Clone)]
pub struct DryRunManifest {
    pub timestamp: DateTime<Local>,
    pub controller: String,
    /// `(key, ip)` when the run targets a configured host.
    pub host: Option<(String, String)>,
    pub source: PathBuf,
    pub target_model: PathBuf,
    pub planned_backup: Option<PathBuf>,
    pub files: Vec<PathBuf>,
}

impl DryRunManifest {
    pub fn marker_name(&self) -> String {
        format!("{}{}.txt", MARKER_PREFIX, self.timestamp.format(TIMESTAMP_FORMAT))
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            "MAVIN Model Injector - DRY RUN (NO FILES COPIED)".to_string(),
            format!("Timestamp: {}", self.timestamp.format(TIMESTAMP_FORMAT)),
            format!("Controller PC: {}", self.controller),
        ];
        if let Some((key, ip)) = &self.host {
            lines.push(format!("PC: {} ({})", key, ip));
        }
        lines.push(String::new());
        lines.push(format!("Source folder: {}", self.source.display()));
        lines.push(format!("Target model folder: {}", self.target_model.display()));
        lines.push(String::new());
        lines.push("Backup (planned):".to_string());
        match &self.planned_backup {
            Some(backup) => lines.push(format!("  {}", backup.display())),
            None => lines.push("  (backup disabled)".to_string()),
        }
        lines.push(String::new());
        lines.push(format!(
            "Files that WOULD be copied/overwritten into target ({}, relative paths):",
            self.files.len()
        ));
        lines.extend(self.files.iter().map(|f| format!("  {}", display_relative(f))));
        lines.join("\n")
    }

    /// Write the marker into `<target_model>/DL_VERSION`, creating that
    /// folder if needed. Returns the marker path.
    pub fn write_marker(&self) -> Result<PathBuf, Error> {
        let dl_version = dl_version_dir(&self.target_model);
        fs::create_dir_all(&dl_version)?;
        let marker = dl_version.join(self.marker_name());
        fs::write(&marker, self.render())?;
        info!("Dry run marker written: {}", marker.display());
        Ok(marker)
    }
}

/// Host name of the machine running the injector.
pub fn controller_name() -> String {
    env::var("COMPUTERNAME")
        .or_else(|_| env::var("HOSTNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

pub fn is_marker(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with(MARKER_PREFIX))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn manifest() -> DryRunManifest {
        DryRunManifest {
            timestamp: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
            controller: "CTRL-01".to_string(),
            host: Some(("PC01".to_string(), "10.0.0.1".to_string())),
            source: PathBuf::from("src_model"),
            target_model: PathBuf::from("Model_A"),
            planned_backup: Some(PathBuf::from("Model_A/DL_VERSION/src_model_1")),
            files: vec![PathBuf::from("a.txt"), Path::new("cfg").join("b.ini")],
        }
    }

    #[test]
    fn test_marker_name_uses_timestamp() {
        assert_eq!(manifest().marker_name(), "_INJECT_DRY_RUN_2024-03-09_14-05-07.txt");
    }

    #[test]
    fn test_render_lists_fields() {
        let text = manifest().render();
        assert!(text.contains("Controller PC: CTRL-01"));
        assert!(text.contains("PC: PC01 (10.0.0.1)"));
        assert!(text.contains("Source folder: src_model"));
        assert!(text.contains("Target model folder: Model_A"));
        assert!(text.contains("src_model_1"));
        assert!(text.contains("  a.txt"));
        assert!(text.contains(r"  cfg\b.ini"));
    }

    #[test]
    fn test_is_marker() {
        assert!(is_marker(Path::new("DL_VERSION/_INJECT_DRY_RUN_2024.txt")));
        assert!(!is_marker(Path::new("DL_VERSION/Model_A")));
    }
}
