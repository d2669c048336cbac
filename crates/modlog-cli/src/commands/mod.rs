//! CLI commands module
//!
//! This module contains all CLI command implementations.

pub mod comment;
pub mod config;
pub mod doctor;
pub mod history;
pub mod init;
pub mod moderate;
pub mod report;
pub mod thread;
pub mod vote;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use modlog_core::config::Config;
use modlog_core::permission::StaticPermissions;
use modlog_core::types::{Actor, CommentId, UserId};
use modlog_core::CommentService;
use modlog_storage::FileSystemStorage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Default configuration path, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = ".modlog/config.toml";

/// modlog - comment moderation and audit trail
#[derive(Debug, Parser)]
#[command(name = "modlog")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Directory holding the board (overrides the configuration)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Act as this user
    #[arg(long = "as", global = true, env = "MODLOG_USER", value_name = "USER")]
    pub acting: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize modlog in the current directory
    Init(init::InitArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(config::ConfigCommand),

    /// Post, edit and read comments
    #[command(subcommand)]
    Comment(comment::CommentCommand),

    /// Vote on a comment
    Vote(vote::VoteArgs),

    /// File and review reports
    #[command(subcommand)]
    Report(report::ReportCommand),

    /// Apply a moderation decision to a comment
    Moderate(moderate::ModerateArgs),

    /// Show a comment's change history
    History(history::HistoryArgs),

    /// Thread operations
    #[command(subcommand)]
    Thread(thread::ThreadCommand),

    /// Check configuration and board consistency
    Doctor(doctor::DoctorArgs),
}

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOpts {
    pub config_path: PathBuf,
    pub data_dir: Option<PathBuf>,
    pub acting: Option<String>,
}

/// Run the CLI application
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    setup_logging(cli.verbose);

    // Handle color output
    if cli.no_color {
        colored::control::set_override(false);
    }

    let opts = GlobalOpts {
        config_path: cli.config,
        data_dir: cli.data_dir,
        acting: cli.acting,
    };

    // Dispatch to command handler
    match cli.command {
        Commands::Init(args) => init::execute(&opts, args),
        Commands::Config(cmd) => config::execute(&opts, cmd),
        Commands::Comment(cmd) => comment::execute(&opts, cmd),
        Commands::Vote(args) => vote::execute(&opts, args),
        Commands::Report(cmd) => report::execute(&opts, cmd),
        Commands::Moderate(args) => moderate::execute(&opts, args),
        Commands::History(args) => history::execute(&opts, args),
        Commands::Thread(cmd) => thread::execute(&opts, cmd),
        Commands::Doctor(args) => doctor::execute(&opts, args),
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the configuration, falling back to defaults when the file is absent
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("No configuration at {:?}, using defaults", path);
        return Ok(Config::default());
    }
    Config::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Board directory: `--data-dir`, then `storage.data_dir`, then `data/` next to the config
pub fn resolve_data_dir(opts: &GlobalOpts, config: &Config) -> PathBuf {
    opts.data_dir
        .clone()
        .or_else(|| config.storage.data_dir.clone())
        .unwrap_or_else(|| {
            opts.config_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new(".modlog"))
                .join("data")
        })
}

/// Everything a command needs: configuration, the service and the acting user
pub struct App {
    pub config: Config,
    pub service: CommentService,
    permissions: StaticPermissions,
    acting: Option<UserId>,
}

impl App {
    pub fn open(opts: &GlobalOpts) -> Result<Self> {
        let config = load_config(&opts.config_path)?;
        let data_dir = resolve_data_dir(opts, &config);
        let storage = FileSystemStorage::new(&data_dir)
            .with_context(|| format!("Failed to open board in {}", data_dir.display()))?;
        let service = CommentService::open(Arc::new(storage), &config)?;

        Ok(Self {
            permissions: StaticPermissions::from_config(&config.permissions),
            acting: opts
                .acting
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(UserId::from_string),
            config,
            service,
        })
    }

    /// The acting user, required by commands that change or gate on identity
    pub fn actor(&self) -> Result<Actor> {
        self.acting
            .as_ref()
            .map(|id| self.permissions.actor_for(id))
            .ok_or_else(|| anyhow!("This command needs an acting user; pass --as <USER>"))
    }

    /// Fail unless the acting user may moderate the comment
    pub fn require_moderator(&self, comment: &CommentId) -> Result<Actor> {
        let actor = self.actor()?;
        if !self.service.can_moderate(&actor, comment)? {
            return Err(anyhow!(
                "{} is not allowed to moderate comment {}",
                actor.id,
                comment
            ));
        }
        Ok(actor)
    }
}

/// Parse a comment id argument
pub fn parse_comment_id(s: &str) -> Result<CommentId> {
    CommentId::from_string(s).with_context(|| format!("Invalid comment ID: {}", s))
}

/// Print a value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_doctor_flags_parse_with_global_verbosity() {
        let cli = Cli::try_parse_from(["modlog", "-vv", "doctor", "--details"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Doctor(args) => assert!(args.details),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_help_text() {
        let cmd = Cli::command();
        assert!(cmd.get_about().is_some());
    }

    #[test]
    fn test_data_dir_defaults_next_to_config() {
        let opts = GlobalOpts {
            config_path: PathBuf::from("site/.modlog/config.toml"),
            data_dir: None,
            acting: None,
        };
        assert_eq!(
            resolve_data_dir(&opts, &Config::default()),
            PathBuf::from("site/.modlog/data")
        );

        let bare = GlobalOpts {
            config_path: PathBuf::from("config.toml"),
            ..opts.clone()
        };
        assert_eq!(
            resolve_data_dir(&bare, &Config::default()),
            PathBuf::from(".modlog/data")
        );
    }

    #[test]
    fn test_data_dir_flag_wins() {
        let mut config = Config::default();
        config.storage.data_dir = Some(PathBuf::from("from-config"));
        let opts = GlobalOpts {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            data_dir: Some(PathBuf::from("from-flag")),
            acting: None,
        };
        assert_eq!(resolve_data_dir(&opts, &config), PathBuf::from("from-flag"));

        let opts = GlobalOpts {
            data_dir: None,
            ..opts
        };
        assert_eq!(resolve_data_dir(&opts, &config), PathBuf::from("from-config"));
    }
}
