use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mavin")]
#[command(about = "Model injection and cell image lookup for MAVIN vision PCs", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./Config.*)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Back up and inject a model folder into a local target model folder
    Inject(InjectArgs),
    /// Back up and inject a model folder into the same model on several PCs
    Push(PushArgs),
    /// List model folders, or the models common to the selected PCs
    Models(HostSelection),
    /// List the configured PCs
    Hosts,
    /// Search the image tree for cell IDs
    Find(FindArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct InjectOptions {
    /// Source model folder to inject
    #[arg(long, short)]
    pub source: PathBuf,

    /// Skip the DL_VERSION backup
    #[arg(long)]
    pub no_backup: bool,

    /// Write a _INJECT_DRY_RUN_ marker instead of copying
    #[arg(long)]
    pub dry_run: bool,

    /// Do not ask for confirmation
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct InjectArgs {
    #[command(flatten)]
    pub options: InjectOptions,

    /// Target model folder
    #[arg(long, short, conflicts_with = "model", required_unless_present = "model")]
    pub target: Option<PathBuf>,

    /// Model folder name under the local MAVIN root
    #[arg(long, short)]
    pub model: Option<String>,
}

#[derive(Debug, Args)]
pub struct HostSelection {
    /// PC key from the configuration (repeatable)
    #[arg(long = "host", value_name = "KEY")]
    pub hosts: Vec<String>,

    /// Select every configured PC
    #[arg(long, conflicts_with = "hosts")]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct PushArgs {
    #[command(flatten)]
    pub options: InjectOptions,

    #[command(flatten)]
    pub selection: HostSelection,

    /// Model folder name, matched case-insensitively on each PC
    #[arg(long, short)]
    pub model: String,
}

#[derive(Debug, Args)]
pub struct FindArgs {
    /// Cell IDs, separated by spaces or commas
    #[arg(long = "cell", value_name = "ID", num_args = 1..)]
    pub cells: Vec<String>,

    /// File with cell IDs (whitespace or comma separated)
    #[arg(long)]
    pub cells_file: Option<PathBuf>,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long, requires = "to", conflicts_with_all = ["dates", "dates_file"])]
    pub from: Option<String>,

    /// Last day of the range, inclusive
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Explicit days to search (repeatable)
    #[arg(long = "date", value_name = "DATE")]
    pub dates: Vec<String>,

    /// File with one day per line; '#' starts a comment
    #[arg(long)]
    pub dates_file: Option<PathBuf>,

    /// Drive letter of the image tree
    #[arg(long)]
    pub drive: Option<String>,

    /// Path of the image tree below the drive
    #[arg(long)]
    pub sub_path: Option<String>,

    /// Search root, overriding drive and sub path
    #[arg(long, conflicts_with_all = ["drive", "sub_path"])]
    pub root: Option<PathBuf>,

    /// Report every match instead of only the latest
    #[arg(long)]
    pub all_matches: bool,

    /// Copy the selected images into <DIR>/<cell id>/
    #[arg(long, value_name = "DIR")]
    pub copy_to: Option<PathBuf>,

    /// Write the result table as CSV
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_find_with_date_list() {
        let cli = Cli::parse_from([
            "mavin", "find", "--cell", "a1", "b2", "--date", "2024-01-01", "--date", "2024-01-05",
        ]);
        match cli.command {
            Some(Commands::Find(args)) => {
                assert_eq!(args.cells, vec!["a1", "b2"]);
                assert_eq!(args.dates.len(), 2);
                assert!(!args.all_matches);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_inject_requires_target_or_model() {
        assert!(Cli::try_parse_from(["mavin", "inject", "--source", "src"]).is_err());
        let with_model = ["mavin", "inject", "--source", "src", "--model", "Model_A"];
        assert!(Cli::try_parse_from(with_model).is_ok());
    }
}
