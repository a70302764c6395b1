use crate::cancel::CancelToken;
use crate::config::HostConfig;
use crate::error::Error;
use crate::injector::engine::{InjectEngine, InjectJob, InjectOutcome};
use crate::injector::paths;
use crate::progress::ProgressReporter;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Model folders found on one host, keyed by lowercase name.
pub type ModelMap = BTreeMap<String, PathBuf>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChoice {
    /// Lowercase key shared by every host.
    pub canonical: String,
    /// Casing as seen on the first selected host.
    pub display: String,
}

#[derive(Debug)]
pub struct HostModels {
    pub host: HostConfig,
    pub models: Result<ModelMap, Error>,
}

#[derive(Debug)]
pub struct ModelCatalog {
    pub per_host: Vec<HostModels>,
    pub common: Vec<ModelChoice>,
}

pub fn scan_host_models(host: &HostConfig, template: &str) -> Result<ModelMap, Error> {
    let root = host.mavin_root(template);
    paths::model_map(&root).map_err(|source| Error::HostUnreachable {
        host: host.key.clone(),
        source,
    })
}

/// Case-insensitive intersection of model names across hosts, sorted by
/// canonical key. Empty when no hosts are given.
pub fn intersect_models(maps: &[ModelMap]) -> Vec<ModelChoice> {
    let Some((first, rest)) = maps.split_first() else {
        return Vec::new();
    };

    let mut common: BTreeSet<&String> = first.keys().collect();
    for map in rest {
        common.retain(|k| map.contains_key(*k));
    }

    common
        .into_iter()
        .map(|canonical| ModelChoice {
            canonical: canonical.clone(),
            display: first
                .get(canonical)
                .map(|p| paths::folder_name(p))
                .unwrap_or_else(|| canonical.clone()),
        })
        .collect()
}

/// Scan every selected host and intersect what they expose. A host that
/// cannot be scanned counts as exposing nothing.
pub fn model_catalog(hosts: &[HostConfig], template: &str) -> ModelCatalog {
    let per_host: Vec<HostModels> = hosts
        .iter()
        .map(|host| {
            let models = scan_host_models(host, template);
            match &models {
                Ok(map) => info!(
                    "{}: found {} model folders under {}",
                    host.key,
                    map.len(),
                    host.mavin_root(template).display()
                ),
                Err(e) => error!("{}: ERROR scanning models: {}", host.key, e),
            }
            HostModels {
                host: host.clone(),
                models,
            }
        })
        .collect();

    let maps: Vec<ModelMap> = per_host
        .iter()
        .map(|h| h.models.as_ref().cloned().unwrap_or_default())
        .collect();
    let common = intersect_models(&maps);
    info!("Intersection models: {}", common.len());

    ModelCatalog { per_host, common }
}

#[derive(Debug)]
pub enum HostStatus {
    Succeeded(InjectOutcome),
    Skipped(String),
    Failed(Error),
    Cancelled,
}

impl HostStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, HostStatus::Failed(_))
    }
}

#[derive(Debug)]
pub struct HostReport {
    pub host: HostConfig,
    pub target_model: Option<PathBuf>,
    pub status: HostStatus,
}

#[derive(Debug, Clone)]
pub struct HostRunOptions {
    pub template: String,
    pub model_canonical: String,
    pub do_backup: bool,
    pub dry_run: bool,
}

/// Inject `source` into the selected model on each host in turn. A failing
/// host is reported and the loop moves on; a cancel marks the rest cancelled.
pub fn run_on_hosts(
    hosts: &[HostConfig],
    source: &Path,
    options: &HostRunOptions,
    reporter: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Vec<HostReport> {
    let mut reports = Vec::with_capacity(hosts.len());

    for host in hosts {
        if cancel.is_cancelled() {
            reports.push(HostReport {
                host: host.clone(),
                target_model: None,
                status: HostStatus::Cancelled,
            });
            continue;
        }

        reporter.on_host_start(&host.key, &host.ip);
        let report = run_on_host(host, source, options, reporter, cancel);
        let (ok, detail) = match &report.status {
            HostStatus::Succeeded(_) => (true, "Completed".to_string()),
            HostStatus::Skipped(reason) => (true, reason.clone()),
            HostStatus::Failed(e) => (false, e.to_string()),
            HostStatus::Cancelled => (false, "Cancelled".to_string()),
        };
        reporter.on_host_complete(&host.key, ok, &detail);
        reports.push(report);
    }

    reports
}

fn run_on_host(
    host: &HostConfig,
    source: &Path,
    options: &HostRunOptions,
    reporter: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> HostReport {
    let models = match scan_host_models(host, &options.template) {
        Ok(models) => models,
        Err(e) => {
            error!("{}: {}", host.key, e);
            return HostReport {
                host: host.clone(),
                target_model: None,
                status: HostStatus::Failed(e),
            };
        }
    };

    let Some(target_model) = models.get(&options.model_canonical).cloned() else {
        warn!("{}: model folder '{}' not found, skipping", host.key, options.model_canonical);
        return HostReport {
            host: host.clone(),
            target_model: None,
            status: HostStatus::Skipped("Model folder not found on this PC".to_string()),
        };
    };

    info!("{}: target model folder {}", host.key, target_model.display());
    let job = InjectJob::new(source, &target_model)
        .with_backup(options.do_backup)
        .with_dry_run(options.dry_run)
        .with_host(&host.key, &host.ip);

    let status = match InjectEngine::new(reporter)
        .with_cancel(cancel.clone())
        .run(&job)
    {
        Ok(outcome) => HostStatus::Succeeded(outcome),
        Err(Error::Cancelled) => HostStatus::Cancelled,
        Err(e) => {
            error!("{}: {}", host.key, e);
            HostStatus::Failed(e)
        }
    };

    HostReport {
        host: host.clone(),
        target_model: Some(target_model),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(names: &[&str]) -> ModelMap {
        names
            .iter()
            .map(|n| (n.to_lowercase(), PathBuf::from("root").join(n)))
            .collect()
    }

    #[test]
    fn test_intersection_is_case_insensitive() {
        let a = map(&["M1", "M2"]);
        let b = map(&["m2", "M3"]);
        let common = intersect_models(&[a, b]);
        assert_eq!(
            common,
            vec![ModelChoice {
                canonical: "m2".to_string(),
                display: "M2".to_string(),
            }]
        );
    }

    #[test]
    fn test_intersection_empty_inputs() {
        assert!(intersect_models(&[]).is_empty());
        assert!(intersect_models(&[map(&["M1"]), ModelMap::new()]).is_empty());
    }

    #[test]
    fn test_intersection_single_host_keeps_all() {
        let common = intersect_models(&[map(&["Model_B", "Model_A"])]);
        let names: Vec<&str> = common.iter().map(|c| c.display.as_str()).collect();
        assert_eq!(names, vec!["Model_A", "Model_B"]);
    }
}
