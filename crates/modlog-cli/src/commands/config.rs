//! Config command
//!
//! Inspect modlog configuration.

use super::{load_config, resolve_data_dir, GlobalOpts};
use anyhow::Result;
use clap::Subcommand;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show {
        /// Show as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Print the configuration file path
    Path,
}

/// Execute the config command
pub fn execute(opts: &GlobalOpts, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => show_config(opts, json),
        ConfigCommand::Validate => validate_config(opts),
        ConfigCommand::Path => {
            println!("{}", opts.config_path.display());
            Ok(())
        }
    }
}

fn show_config(opts: &GlobalOpts, as_json: bool) -> Result<()> {
    use colored::Colorize;

    let config = load_config(&opts.config_path)?;

    if as_json {
        return super::print_json(&config);
    }

    println!("{}", "Configuration:".bold().underline());
    if opts.config_path.exists() {
        println!("{}", opts.config_path.display().to_string().dimmed());
    } else {
        println!(
            "{}",
            format!("{} not found, showing defaults", opts.config_path.display()).dimmed()
        );
    }
    println!(
        "{}",
        format!("data: {}", resolve_data_dir(opts, &config).display()).dimmed()
    );
    println!();
    println!("{}", config.to_toml()?);

    Ok(())
}

fn validate_config(opts: &GlobalOpts) -> Result<()> {
    use colored::Colorize;

    if !opts.config_path.exists() {
        eprintln!(
            "{} Configuration not found at {}. Run '{}' to create.",
            "⚠".yellow(),
            opts.config_path.display(),
            "modlog init".cyan()
        );
        return Ok(());
    }

    let config = load_config(&opts.config_path)?;
    println!("{} Configuration is valid", "✓".green());

    for warning in config_warnings(&config) {
        println!("{} {}", "⚠".yellow(), warning);
    }

    Ok(())
}

/// Settings that parse but are probably wrong
pub fn config_warnings(config: &modlog_core::config::Config) -> Vec<String> {
    let mut warnings = Vec::new();
    let permissions = &config.permissions;

    if permissions.superusers.is_empty()
        && permissions.staff.is_empty()
        && permissions.project_moderators.is_empty()
    {
        warnings.push("No moderators configured; nobody can moderate".to_string());
    }
    for junior in &permissions.junior_moderators {
        if permissions.senior_moderators.contains(junior) {
            warnings.push(format!("{} is listed as both junior and senior", junior));
        }
    }
    if config.moderation.max_suspension_days == 0 {
        warnings.push("max_suspension_days is 0; suspensions cannot carry a duration".to_string());
    }
    if config.validation.min_comment_length > config.validation.max_comment_length {
        warnings.push("min_comment_length exceeds max_comment_length".to_string());
    }

    warnings
}
