use crate::cancel::CancelToken;
use crate::error::Error;
use crate::progress::ProgressReporter;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Files and folders to copy from `source` into an existing `target`.
#[derive(Debug, Clone)]
pub struct CopyPlan {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Relative directories, sorted; mirrored even when empty.
    pub directories: Vec<PathBuf>,
    /// Relative file paths, sorted.
    pub files: Vec<PathBuf>,
}

impl CopyPlan {
    /// Validate both roots and list the source tree. Nothing is written.
    pub fn build(source: &Path, target: &Path) -> Result<Self, Error> {
        if !source.is_dir() {
            return Err(Error::SourceNotFound(source.to_path_buf()));
        }
        if !target.is_dir() {
            return Err(Error::TargetNotFound(target.to_path_buf()));
        }
        check_overlap(source, target)?;

        let (directories, files) = walk_relative(source)?;
        if files.is_empty() {
            return Err(Error::EmptySource(source.to_path_buf()));
        }

        Ok(Self {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            directories,
            files,
        })
    }

    pub fn total_files(&self) -> usize {
        self.files.len()
    }
}

/// Reject a target that is the source itself or lies inside it. Copying a
/// file onto itself truncates it, and a nested target is walked as source.
/// A source inside the target (re-injecting a `DL_VERSION` backup) is allowed.
fn check_overlap(source: &Path, target: &Path) -> Result<(), Error> {
    let source_dir = fs::canonicalize(source)?;
    let target_dir = fs::canonicalize(target)?;
    if target_dir.starts_with(&source_dir) {
        return Err(Error::SameFolder {
            source_dir,
            target_dir,
        });
    }
    Ok(())
}

/// Copy every file of the plan to the same relative path under the target,
/// overwriting what is there. Nothing under the target is ever deleted.
///
/// The first failing file aborts the run; files already copied stay.
pub fn copy_overwrite_only(
    plan: &CopyPlan,
    reporter: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Result<usize, Error> {
    let start = Instant::now();
    let total = plan.total_files();
    info!(
        "Copying {} files from {} into {}",
        total,
        plan.source.display(),
        plan.target.display()
    );
    reporter.on_copy_start(total);

    for rel in &plan.directories {
        let dst = plan.target.join(rel);
        fs::create_dir_all(&dst).map_err(|e| Error::copy(&dst, e))?;
    }

    let mut copied = 0;
    for rel in &plan.files {
        cancel.check()?;
        let src = plan.source.join(rel);
        let dst = plan.target.join(rel);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::copy(parent, e))?;
        }
        copy_file(&src, &dst)?;
        copied += 1;
        debug!("Copied {}", rel.display());
        reporter.on_file_copied(copied, total, rel);
    }

    let duration = start.elapsed();
    reporter.on_copy_complete(copied, duration.as_secs_f64());
    info!("Copied {} files in {:.2}s", copied, duration.as_secs_f64());
    Ok(copied)
}

/// `fs::copy`, naming the source when it cannot be read and the destination
/// otherwise.
pub(crate) fn copy_file(src: &Path, dst: &Path) -> Result<u64, Error> {
    fs::File::open(src).map_err(|e| Error::copy(src, e))?;
    fs::copy(src, dst).map_err(|e| Error::copy(dst, e))
}

pub fn list_relative_files(root: &Path) -> Result<Vec<PathBuf>, Error> {
    Ok(walk_relative(root)?.1)
}

pub fn count_files(root: &Path) -> Result<usize, Error> {
    Ok(list_relative_files(root)?.len())
}

fn walk_relative(root: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), Error> {
    let mut directories = Vec::new();
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::copy(path, e.into())
        })?;
        let rel = match entry.path().strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };
        if entry.file_type().is_dir() {
            directories.push(rel);
        } else if entry.path().is_file() {
            files.push(rel);
        }
    }

    directories.sort();
    files.sort();
    Ok((directories, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use tempfile::tempdir;

    #[test]
    fn test_plan_rejects_missing_roots() {
        let tmp = tempdir().unwrap();
        let existing = tmp.path().join("exists");
        fs::create_dir(&existing).unwrap();
        fs::write(existing.join("a.txt"), "a").unwrap();

        let missing = tmp.path().join("missing");
        assert!(matches!(
            CopyPlan::build(&missing, &existing),
            Err(Error::SourceNotFound(_))
        ));
        assert!(matches!(
            CopyPlan::build(&existing, &missing),
            Err(Error::TargetNotFound(_))
        ));
    }

    #[test]
    fn test_plan_rejects_empty_source() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(src.join("only_dirs")).unwrap();
        fs::create_dir(&dst).unwrap();

        assert!(matches!(
            CopyPlan::build(&src, &dst),
            Err(Error::EmptySource(_))
        ));
    }

    #[test]
    fn test_plan_rejects_target_inside_source() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("Model_A");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("model.cfg"), "threshold=0.7").unwrap();

        assert!(matches!(
            CopyPlan::build(&src, &src),
            Err(Error::SameFolder { .. })
        ));
        assert!(matches!(
            CopyPlan::build(&src, &src.join("sub")),
            Err(Error::SameFolder { .. })
        ));
        assert_eq!(fs::read_to_string(src.join("model.cfg")).unwrap(), "threshold=0.7");
    }

    #[test]
    fn test_plan_allows_source_inside_target() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("Model_A");
        let old = target.join("DL_VERSION").join("Model_A_v1");
        fs::create_dir_all(&old).unwrap();
        fs::write(old.join("model.cfg"), "threshold=0.5").unwrap();

        let plan = CopyPlan::build(&old, &target).unwrap();
        assert_eq!(plan.files, vec![PathBuf::from("model.cfg")]);
    }

    #[test]
    fn test_copy_mirrors_empty_directories() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(src.join("empty")).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::create_dir(&dst).unwrap();

        let plan = CopyPlan::build(&src, &dst).unwrap();
        let copied = copy_overwrite_only(&plan, &SilentReporter, &CancelToken::new()).unwrap();
        assert_eq!(copied, 1);
        assert!(dst.join("empty").is_dir());
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
    }

    #[test]
    fn test_cancelled_copy_stops_before_first_file() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir(&src).unwrap();
        fs::create_dir(&dst).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();

        let plan = CopyPlan::build(&src, &dst).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            copy_overwrite_only(&plan, &SilentReporter, &cancel),
            Err(Error::Cancelled)
        ));
        assert!(!dst.join("a.txt").exists());
    }

    #[test]
    fn test_copy_file_names_the_failing_side() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("a.txt");
        let missing = tmp.path().join("missing.txt");
        let blocked = tmp.path().join("blocked");
        fs::write(&src, "a").unwrap();
        fs::create_dir(&blocked).unwrap();

        match copy_file(&missing, &tmp.path().join("out.txt")) {
            Err(Error::Copy { path, .. }) => assert_eq!(path, missing),
            other => panic!("Expected a copy failure, got {:?}", other),
        }
        match copy_file(&src, &blocked) {
            Err(Error::Copy { path, .. }) => assert_eq!(path, blocked),
            other => panic!("Expected a copy failure, got {:?}", other),
        }
    }

    #[test]
    fn test_list_relative_files_sorted() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("b")).unwrap();
        fs::write(tmp.path().join("b").join("z.bin"), "z").unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();

        let files = list_relative_files(tmp.path()).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("a.txt"), Path::new("b").join("z.bin")]
        );
        assert_eq!(count_files(tmp.path()).unwrap(), 2);
    }
}
