use crate::cancel::CancelToken;
use crate::error::Error;
use crate::injector::backup::{self, next_backup_path};
use crate::injector::copier::{self, CopyPlan};
use crate::injector::dry_run::{controller_name, DryRunManifest};
use crate::injector::paths::{dl_version_dir, folder_name};
use crate::progress::ProgressReporter;
use chrono::Local;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone)]
pub struct InjectJob {
    pub source: PathBuf,
    pub target_model: PathBuf,
    pub do_backup: bool,
    pub dry_run: bool,
    /// `(key, ip)` recorded in dry-run markers for host runs.
    pub host: Option<(String, String)>,
}

impl InjectJob {
    pub fn new(source: impl Into<PathBuf>, target_model: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target_model: target_model.into(),
            do_backup: true,
            dry_run: false,
            host: None,
        }
    }

    pub fn with_backup(mut self, do_backup: bool) -> Self {
        self.do_backup = do_backup;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_host(mut self, key: &str, ip: &str) -> Self {
        self.host = Some((key.to_string(), ip.to_string()));
        self
    }
}

#[derive(Debug)]
pub enum InjectOutcome {
    Injected {
        files_copied: usize,
        backup: Option<PathBuf>,
        backup_duration: Duration,
        copy_duration: Duration,
    },
    DryRun {
        marker: PathBuf,
        planned_backup: Option<PathBuf>,
        files: usize,
    },
}

pub struct InjectEngine<'a> {
    reporter: &'a dyn ProgressReporter,
    cancel: CancelToken,
}

impl<'a> InjectEngine<'a> {
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

    /// Run one injection:
    /// 1. Validate source and target, list the source tree
    /// 2. Back up the full source into `DL_VERSION` (unless disabled)
    /// 3. Overwrite-only copy into the target model folder
    ///
    /// A dry run stops after step 1 and writes a marker file instead.
    pub fn run(&self, job: &InjectJob) -> Result<InjectOutcome, Error> {
        info!("Source: {}", job.source.display());
        info!("Target: {}", job.target_model.display());

        let plan = CopyPlan::build(&job.source, &job.target_model)?;

        if job.dry_run {
            return self.dry_run(job, &plan);
        }

        let backup_start = Instant::now();
        let backup = if job.do_backup {
            info!("Creating backup in DL_VERSION ...");
            let dir = backup::backup_source(
                &job.source,
                &job.target_model,
                self.reporter,
                &self.cancel,
            )?;
            info!("Backup saved to: {}", dir.display());
            Some(dir)
        } else {
            None
        };
        let backup_duration = backup_start.elapsed();

        info!("Copying (overwrite-only) into target model folder ...");
        let copy_start = Instant::now();
        let files_copied = copier::copy_overwrite_only(&plan, self.reporter, &self.cancel)?;

        Ok(InjectOutcome::Injected {
            files_copied,
            backup,
            backup_duration,
            copy_duration: copy_start.elapsed(),
        })
    }

    fn dry_run(&self, job: &InjectJob, plan: &CopyPlan) -> Result<InjectOutcome, Error> {
        let planned_backup = job.do_backup.then(|| {
            next_backup_path(&dl_version_dir(&job.target_model), &folder_name(&job.source))
        });

        let manifest = DryRunManifest {
            timestamp: Local::now(),
            controller: controller_name(),
            host: job.host.clone(),
            source: job.source.clone(),
            target_model: job.target_model.clone(),
            planned_backup: planned_backup.clone(),
            files: plan.files.clone(),
        };
        let marker = manifest.write_marker()?;

        Ok(InjectOutcome::DryRun {
            marker,
            planned_backup,
            files: plan.total_files(),
        })
    }
}
