//! Init command
//!
//! Initialize modlog configuration and data directory.

use super::{resolve_data_dir, GlobalOpts};
use anyhow::{Context, Result};
use clap::Args;
use modlog_core::config::Config;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Force overwrite existing configuration
    #[arg(long)]
    pub force: bool,

    /// Start new comments as PENDING until a moderator approves them
    #[arg(long)]
    pub pre_moderation: bool,
}

/// Execute the init command
pub fn execute(opts: &GlobalOpts, args: InitArgs) -> Result<()> {
    use colored::Colorize;

    let config_path = &opts.config_path;
    println!("Initializing modlog at {}...", config_path.display());

    if config_path.exists() && !args.force {
        eprintln!(
            "{} modlog already initialized. Use --force to reinitialize.",
            "⚠".yellow()
        );
        return Ok(());
    }

    // Backup existing
    if config_path.exists() {
        let backup_path = format!(
            "{}.backup-{}",
            config_path.display(),
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        );
        fs::copy(config_path, &backup_path)?;
        println!("{} Backed up to {}", "✓".green(), backup_path);
    }

    let mut config = Config::default();
    config.moderation.pre_moderation = args.pre_moderation;

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(config_path, generate_config(&config)?).context("Failed to write config.toml")?;
    println!("{} Generated {}", "✓".green(), config_path.display());

    let data_dir = resolve_data_dir(opts, &config);
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    println!("{} Created data directory {}", "✓".green(), data_dir.display());

    if Path::new(".git").exists() {
        update_gitignore(Path::new("."), &data_dir)?;
        println!("{} Updated .gitignore", "✓".green());
    }

    println!("\n{}", "Next steps:".bold());
    println!("  1. Grant moderators in the [permissions] section of the config");
    println!("  2. Map tasks and needs to projects in the [context] section");
    println!("  3. Post a comment:");
    println!("     ");
    println!(
        "     {}",
        "modlog --as alice comment add --on project:p1 \"Hello\"".cyan()
    );
    println!("\nTip: Run '{}' to verify your setup", "modlog doctor".cyan());

    Ok(())
}

fn generate_config(config: &Config) -> Result<String> {
    let body = config.to_toml()?;
    Ok(format!(
        r#"# modlog configuration
#
# [permissions]
# superusers = ["root"]
# staff = ["ops"]
# junior_moderators = ["trainee"]
#
# [permissions.project_moderators]
# p1 = ["mod", "trainee"]
#
# [context.tasks]
# t1 = "p1"

{}"#,
        body
    ))
}

fn update_gitignore(project_dir: &Path, data_dir: &Path) -> Result<()> {
    let gitignore_path = project_dir.join(".gitignore");
    let pattern = format!("{}/", data_dir.display());
    let entries = format!("\n# modlog\n{}\n", pattern);

    if gitignore_path.exists() {
        let content = fs::read_to_string(&gitignore_path)?;
        if !content.lines().any(|line| line.trim() == pattern) {
            let mut file = fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            use std::io::Write;
            file.write_all(entries.as_bytes())?;
        }
    } else {
        fs::write(&gitignore_path, entries)?;
    }

    Ok(())
}
