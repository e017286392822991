// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use efs_provisioner_core::domain::provisioner_config::{ProvisionerConfig, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./efs-provisioner.yaml)
        #[arg(short, long, default_value = "./efs-provisioner.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ProvisionerConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./efs-provisioner.yaml");
        println!("  4. ~/.efs-provisioner/config.yaml");
        println!("  5. /etc/efs-provisioner/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Provisioner:".bold());
    println!("  Name: {}", display_or_unset(&config.provisioner_name));
    println!();

    println!("{}", "File System:".bold());
    println!("  ID: {}", display_or_unset(&config.file_system_id));
    println!("  Region: {}", display_or_unset(&config.aws_region));
    println!("  Server: {}", config.server_name());
    println!();

    println!("{}", "Mount:".bold());
    match &config.mount {
        Some(mount) => {
            println!("  Mountpoint: {}", mount.mountpoint.display());
            println!("  Source: {}", mount.source);
        }
        None => println!("  Discovered from: {}", config.mount_table.display()),
    }
    println!();

    Ok(())
}

fn display_or_unset(value: &str) -> String {
    if value.is_empty() {
        "(not set)".dimmed().to_string()
    } else {
        value.to_string()
    }
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ProvisionerConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
