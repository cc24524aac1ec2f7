mod cmd_config;
mod cmd_init;
mod cmd_policy;
mod cmd_profile;
mod cmd_restore;
mod cmd_save;
mod config;
mod host;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loadout", version, about = "Editor profiles with inheritance")]
struct Cli {
    /// Profile repository (defaults to $LOADOUT_REPO, then the user data directory)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a profile repository
    Init,
    /// Create a profile
    Create {
        /// Profile name ([A-Za-z0-9._-], at most 64 characters)
        name: String,
        /// Parent profile to inherit from
        #[arg(long)]
        extends: Option<String>,
    },
    /// List profiles
    List,
    /// Show a profile's effective state after inheritance
    Show {
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Capture the live editor into a profile
    #[command(alias = "serialize")]
    Save { name: String },
    /// Apply a profile to the live editor
    Restore {
        name: String,
        /// Print what would change without touching the editor
        #[arg(long)]
        dry_run: bool,
        /// Do not ask before restarting or reloading the editor
        #[arg(short, long)]
        yes: bool,
    },
    /// Host configuration (editor paths and commands)
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
    /// Per-profile sync policy
    Policy {
        #[command(subcommand)]
        cmd: cmd_policy::PolicyCmd,
    },
}

fn repo_root(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("LOADOUT_REPO").map(PathBuf::from))
        .unwrap_or_else(loadout_store::default_repo_root)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let repo_root = repo_root(cli.repo);

    match cli.cmd {
        Command::Init => cmd_init::execute(&repo_root),
        Command::Create { name, extends } => {
            cmd_profile::create(&repo_root, &name, extends.as_deref())
        }
        Command::List => cmd_profile::list(&repo_root),
        Command::Show { name, json } => cmd_profile::show(&repo_root, &name, json),
        Command::Save { name } => cmd_save::execute(&repo_root, &name),
        Command::Restore { name, dry_run, yes } => {
            cmd_restore::execute(&repo_root, &name, dry_run, yes)
        }
        Command::Config { cmd } => cmd_config::run(cmd, &repo_root),
        Command::Policy { cmd } => cmd_policy::run(cmd, &repo_root),
    }
}
