use std::fs;
use std::path::Path;
use tempfile::tempdir;

use mavin_core::injector::hosts::{model_catalog, run_on_hosts, HostRunOptions, HostStatus};
use mavin_core::injector::paths::DL_VERSION_DIRNAME;
use mavin_core::{CancelToken, HostConfig, InjectOutcome, SilentReporter};

fn host(key: &str, ip: &str) -> HostConfig {
    HostConfig {
        key: key.to_string(),
        line: "3-1".to_string(),
        polarity: "+".to_string(),
        ip: ip.to_string(),
    }
}

/// Template that maps each host ip to `<root>/<ip>/MAVIN`.
fn template(root: &Path) -> String {
    root.join("{host}").join("MAVIN").to_string_lossy().into_owned()
}

fn add_models(root: &Path, ip: &str, models: &[&str]) {
    for model in models {
        fs::create_dir_all(root.join(ip).join("MAVIN").join(model)).unwrap();
    }
}

#[test]
fn test_catalog_intersects_case_insensitively() {
    let tmp = tempdir().unwrap();
    add_models(tmp.path(), "10.0.0.1", &["M1", "M2"]);
    add_models(tmp.path(), "10.0.0.2", &["m2", "M3"]);

    let hosts = vec![host("PC01", "10.0.0.1"), host("PC02", "10.0.0.2")];
    let catalog = model_catalog(&hosts, &template(tmp.path()));

    let names: Vec<&str> = catalog.common.iter().map(|c| c.display.as_str()).collect();
    assert_eq!(names, vec!["M2"]);
    assert_eq!(catalog.common[0].canonical, "m2");
    assert!(catalog.per_host.iter().all(|h| h.models.is_ok()));
}

#[test]
fn test_unreachable_host_empties_intersection() {
    let tmp = tempdir().unwrap();
    add_models(tmp.path(), "10.0.0.1", &["M1"]);

    let hosts = vec![host("PC01", "10.0.0.1"), host("PC09", "10.0.0.9")];
    let catalog = model_catalog(&hosts, &template(tmp.path()));

    assert!(catalog.common.is_empty());
    assert!(catalog.per_host[1].models.is_err());
}

#[test]
fn test_fan_out_is_best_effort() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("Model_A_v2");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("model.cfg"), "threshold=0.7").unwrap();

    add_models(tmp.path(), "10.0.0.1", &["Model_A"]);
    add_models(tmp.path(), "10.0.0.3", &["MODEL_A"]);
    add_models(tmp.path(), "10.0.0.4", &["Model_B"]);

    let hosts = vec![
        host("PC01", "10.0.0.1"),
        host("PC02", "10.0.0.2"), // no share at all
        host("PC03", "10.0.0.3"),
        host("PC04", "10.0.0.4"), // model missing
    ];
    let options = HostRunOptions {
        template: template(tmp.path()),
        model_canonical: "model_a".to_string(),
        do_backup: true,
        dry_run: false,
    };

    let reports = run_on_hosts(&hosts, &source, &options, &SilentReporter, &CancelToken::new());
    assert_eq!(reports.len(), 4);
    assert!(matches!(reports[0].status, HostStatus::Succeeded(InjectOutcome::Injected { .. })));
    assert!(reports[1].status.is_failure());
    assert!(matches!(reports[2].status, HostStatus::Succeeded(_)));
    assert!(matches!(reports[3].status, HostStatus::Skipped(_)));

    let pc3_model = tmp.path().join("10.0.0.3").join("MAVIN").join("MODEL_A");
    assert_eq!(fs::read_to_string(pc3_model.join("model.cfg")).unwrap(), "threshold=0.7");
    assert!(pc3_model.join(DL_VERSION_DIRNAME).join("Model_A_v2").is_dir());
}

#[test]
fn test_cancelled_run_marks_remaining_hosts() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("src");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "a").unwrap();
    add_models(tmp.path(), "10.0.0.1", &["Model_A"]);

    let cancel = CancelToken::new();
    cancel.cancel();
    let options = HostRunOptions {
        template: template(tmp.path()),
        model_canonical: "model_a".to_string(),
        do_backup: false,
        dry_run: false,
    };
    let hosts = [host("PC01", "10.0.0.1")];
    let reports = run_on_hosts(&hosts, &source, &options, &SilentReporter, &cancel);
    assert!(matches!(reports[0].status, HostStatus::Cancelled));
    assert!(!tmp
        .path()
        .join("10.0.0.1")
        .join("MAVIN")
        .join("Model_A")
        .join("a.txt")
        .exists());
}

#[test]
fn test_dry_run_per_host_records_host() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("src");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "a").unwrap();
    add_models(tmp.path(), "10.0.0.1", &["Model_A"]);

    let options = HostRunOptions {
        template: template(tmp.path()),
        model_canonical: "model_a".to_string(),
        do_backup: true,
        dry_run: true,
    };
    let hosts = [host("PC01", "10.0.0.1")];
    let cancel = CancelToken::new();
    let reports = run_on_hosts(&hosts, &source, &options, &SilentReporter, &cancel);
    let marker = match &reports[0].status {
        HostStatus::Succeeded(InjectOutcome::DryRun { marker, .. }) => marker.clone(),
        other => panic!("Expected a dry run, got {:?}", other),
    };
    let text = fs::read_to_string(marker).unwrap();
    assert!(text.contains("PC: PC01 (10.0.0.1)"));
    assert!(!tmp
        .path()
        .join("10.0.0.1")
        .join("MAVIN")
        .join("Model_A")
        .join("a.txt")
        .exists());
}
