mod commands;
mod logging;
mod progress;
mod prompt;

use std::fs;
use std::process;

use anyhow::{anyhow, bail, Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, FindArgs, HostSelection, InjectArgs, PushArgs};
use dotenv::dotenv;
use mavin_core::finder::dates::{parse_date, parse_date_lines};
use mavin_core::finder::engine::search_root;
use mavin_core::finder::matcher::normalize_cell_ids;
use mavin_core::finder::{report, CellStatus, DateSelector, FindEngine, FindRequest};
use mavin_core::injector::hosts::{self, HostRunOptions, HostStatus};
use mavin_core::injector::paths;
use mavin_core::{AppConfig, CancelToken, HostConfig, InjectEngine, InjectJob, InjectOutcome};
use progress::CliReporter;
use prompt::prompt_confirm;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let guard = logging::init_logger();
    let args = Cli::parse();

    let loaded = match &args.config {
        Some(path) => mavin_core::config::load_configuration_from(path),
        None => mavin_core::config::load_configuration(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            drop(guard);
            process::exit(1);
        }
    };

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        warn!("Stop requested; finishing the current file...");
        handler_token.cancel();
    }) {
        warn!("Could not install Ctrl+C handler: {}", err);
    }

    let result = match args.command {
        Some(Commands::Inject(args)) => run_inject(&config, &args, &cancel),
        Some(Commands::Push(args)) => run_push(&config, &args, &cancel),
        Some(Commands::Models(selection)) => run_models(&config, &selection),
        Some(Commands::Hosts) => run_hosts(&config),
        Some(Commands::Find(args)) => run_find(&config, &args, &cancel),
        Some(Commands::PrintConfig) => print_config(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        drop(guard);
        process::exit(1);
    }
}

fn confirm(message: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    prompt_confirm(message, Some(false)).context("Failed to read confirmation")
}

fn run_inject(config: &AppConfig, args: &InjectArgs, cancel: &CancelToken) -> Result<()> {
    let target = match (&args.target, &args.model) {
        (Some(target), _) => target.clone(),
        (None, Some(model)) => {
            let default_root = config.local_mavin_root();
            let root = paths::locate_mavin_root(&default_root)
                .ok_or_else(|| anyhow!("MAVIN folder not found at {}", default_root.display()))?;
            if root.discovered {
                info!("Using MAVIN folder {}", root.path.display());
            }
            let models = paths::model_map(&root.path)
                .with_context(|| format!("Failed to list {}", root.path.display()))?;
            models.get(&model.to_lowercase()).cloned().ok_or_else(|| {
                anyhow!(
                    "Model folder '{}' not found under {}",
                    model,
                    root.path.display()
                )
            })?
        }
        (None, None) => bail!("Either --target or --model is required"),
    };

    let opts = &args.options;
    let mode = if opts.dry_run {
        "DRY RUN (marker file only)"
    } else {
        "INJECTION (copy files)"
    };
    let message = format!(
        "Mode: {}\nSource: {}\nTarget: {}\nContinue?",
        mode,
        opts.source.display(),
        target.display()
    );
    if !confirm(&message, opts.yes)? {
        info!("Cancelled by operator.");
        return Ok(());
    }

    let job = InjectJob::new(&opts.source, &target)
        .with_backup(!opts.no_backup)
        .with_dry_run(opts.dry_run);
    let reporter = CliReporter::new();
    let outcome = InjectEngine::new(&reporter)
        .with_cancel(cancel.clone())
        .run(&job)
        .context("Injection failed")?;
    print_outcome("local", &outcome);
    Ok(())
}

fn print_outcome(label: &str, outcome: &InjectOutcome) {
    match outcome {
        InjectOutcome::Injected {
            files_copied,
            backup,
            backup_duration,
            copy_duration,
        } => {
            info!(
                "{}: {} files injected (backup: {}, copy: {})",
                label,
                format!("{}", files_copied).green(),
                format!("{:.2}s", backup_duration.as_secs_f64()).green(),
                format!("{:.2}s", copy_duration.as_secs_f64()).green(),
            );
            if let Some(backup) = backup {
                info!("{}: backup saved to {}", label, backup.display().to_string().cyan());
            }
        }
        InjectOutcome::DryRun {
            marker,
            planned_backup,
            files,
        } => {
            info!(
                "{}: dry run marker written to {} ({} files planned)",
                label,
                marker.display().to_string().cyan(),
                format!("{}", files).yellow(),
            );
            if let Some(backup) = planned_backup {
                info!("{}: backup would go to {}", label, backup.display());
            }
        }
    }
}

fn select_hosts(config: &AppConfig, selection: &HostSelection) -> Result<Vec<HostConfig>> {
    if selection.all {
        return Ok(config.hosts.clone());
    }
    selection
        .hosts
        .iter()
        .map(|key| {
            config
                .host(key)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown PC '{}'; see `mavin hosts`", key))
        })
        .collect()
}

fn run_push(config: &AppConfig, args: &PushArgs, cancel: &CancelToken) -> Result<()> {
    let selected = select_hosts(config, &args.selection)?;
    if selected.is_empty() {
        bail!("Select at least one PC with --host or --all");
    }
    let opts = &args.options;
    if !opts.source.is_dir() {
        bail!("Please choose a valid source folder: {}", opts.source.display());
    }

    let mode = if opts.dry_run {
        "DRY RUN (marker files only)"
    } else {
        "INJECTION (copy files)"
    };
    let message = format!(
        "Mode: {}\nSelected PCs: {}\nModel: {}\nSource: {}\nContinue?",
        mode,
        selected.len(),
        args.model,
        opts.source.display()
    );
    if !confirm(&message, opts.yes)? {
        info!("Cancelled by operator.");
        return Ok(());
    }

    info!("Starting {} ...", mode);
    let options = HostRunOptions {
        template: config.remote_root_template.clone(),
        model_canonical: args.model.to_lowercase(),
        do_backup: !opts.no_backup,
        dry_run: opts.dry_run,
    };
    let reporter = CliReporter::new();
    let reports = hosts::run_on_hosts(&selected, &opts.source, &options, &reporter, cancel);

    let mut failed = 0;
    for report in &reports {
        let key = &report.host.key;
        match &report.status {
            HostStatus::Succeeded(outcome) => print_outcome(key, outcome),
            HostStatus::Skipped(reason) => info!("{}: {} ({})", key, "SKIPPED".yellow(), reason),
            HostStatus::Failed(e) => {
                failed += 1;
                error!("{}: {} ({})", key, "FAILED".red(), e);
            }
            HostStatus::Cancelled => info!("{}: {}", key, "CANCELLED".yellow()),
        }
    }

    if failed > 0 {
        bail!("{} of {} PCs failed", failed, reports.len());
    }
    Ok(())
}

fn run_models(config: &AppConfig, selection: &HostSelection) -> Result<()> {
    if !selection.all && selection.hosts.is_empty() {
        let default_root = config.local_mavin_root();
        let root = paths::locate_mavin_root(&default_root)
            .ok_or_else(|| anyhow!("MAVIN folder not found at {}", default_root.display()))?;
        let models = paths::list_model_folders(&root.path)
            .with_context(|| format!("Failed to list {}", root.path.display()))?;
        println!("{} ({} models)", root.path.display().to_string().cyan(), models.len());
        for model in models {
            println!("  {}", paths::folder_name(&model));
        }
        return Ok(());
    }

    let selected = select_hosts(config, selection)?;
    let catalog = hosts::model_catalog(&selected, &config.remote_root_template);
    for host in &catalog.per_host {
        match &host.models {
            Ok(models) => println!("{}: {} model folders", host.host.key.cyan(), models.len()),
            Err(e) => println!("{}: {} {}", host.host.key.cyan(), "ERROR".red(), e),
        }
    }
    if catalog.common.is_empty() {
        println!("{}", "(No common model folders across selected PCs)".yellow());
    } else {
        println!("Common models ({}):", catalog.common.len());
        for choice in &catalog.common {
            println!("  {}", choice.display.green());
        }
    }
    Ok(())
}

fn run_hosts(config: &AppConfig) -> Result<()> {
    if config.hosts.is_empty() {
        println!("{}", "No PCs configured; add [[hosts]] entries to Config.toml".yellow());
        return Ok(());
    }
    println!("{:<10} {:<8} {:<8} {:<16} {}", "KEY", "LINE", "POLARITY", "IP", "MAVIN ROOT");
    for host in &config.hosts {
        println!(
            "{:<10} {:<8} {:<8} {:<16} {}",
            host.key,
            host.line,
            host.polarity,
            host.ip,
            host.mavin_root(&config.remote_root_template).display()
        );
    }
    Ok(())
}

fn date_selector(args: &FindArgs) -> Result<DateSelector> {
    if let (Some(from), Some(to)) = (&args.from, &args.to) {
        return Ok(DateSelector::Range {
            start: parse_date(from)?,
            end: parse_date(to)?,
        });
    }

    let mut dates = args
        .dates
        .iter()
        .map(|d| parse_date(d))
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(file) = &args.dates_file {
        let text = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        dates.extend(parse_date_lines(&text)?);
    }
    if dates.is_empty() {
        let today = chrono::Local::now().date_naive();
        info!("No dates given; searching today ({})", today);
        dates.push(today);
    }
    Ok(DateSelector::List(dates))
}

fn run_find(config: &AppConfig, args: &FindArgs, cancel: &CancelToken) -> Result<()> {
    let mut raw_cells = args.cells.join(" ");
    if let Some(file) = &args.cells_file {
        let text = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        raw_cells.push(' ');
        raw_cells.push_str(&text);
    }
    let cell_ids = normalize_cell_ids(&raw_cells);
    if cell_ids.is_empty() {
        bail!("Please enter at least one cell ID (--cell or --cells-file)");
    }

    let root = match &args.root {
        Some(root) => root.clone(),
        None => search_root(
            args.drive.as_deref().unwrap_or(&config.finder.drive),
            args.sub_path.as_deref().unwrap_or(&config.finder.sub_path),
        ),
    };

    let request = FindRequest {
        root,
        dates: date_selector(args)?,
        cell_ids,
        latest_only: !args.all_matches,
        copy_to: args.copy_to.clone(),
    };

    let reporter = CliReporter::new();
    let report = FindEngine::new(&reporter)
        .with_cancel(cancel.clone())
        .run(&request)
        .context("Search failed")?;

    for result in &report.results {
        match result.status {
            CellStatus::NotFound => println!("{} {}", result.cell_id.bold(), "NOT FOUND".red()),
            CellStatus::Found => {
                println!(
                    "{} {} ({} matches)",
                    result.cell_id.bold(),
                    "FOUND".green(),
                    result.match_count
                );
                for candidate in &result.selected {
                    println!(
                        "    {} {:<16} {} [{}]",
                        candidate.chosen_date(),
                        candidate.category.to_string(),
                        candidate.folder.display(),
                        candidate.completeness().as_str()
                    );
                }
                for copied in &result.copied {
                    println!("    -> {}", copied.display().to_string().cyan());
                }
            }
        }
    }

    info!(
        "{} of {} cells found across {} day(s), {} folders scanned",
        format!("{}", report.found()).green(),
        report.results.len(),
        report.days,
        report.folders_scanned,
    );

    if let Some(csv_path) = &args.csv {
        report::write_csv(csv_path, &report.results)
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        info!("Results written to {}", csv_path.display());
    }
    Ok(())
}

fn print_config(config: &AppConfig) -> Result<()> {
    let text = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", text);
    Ok(())
}
