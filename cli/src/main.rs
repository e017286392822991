// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # EFS Provisioner CLI
//!
//! The `efs-provisioner` binary is the operator's view onto the directory
//! provisioner: the same configuration, mount discovery, metadata and path
//! mapping the controller uses, without running the controller.
//!
//! ## Commands
//!
//! - `efs-provisioner config show|validate|generate` - Configuration management
//! - `efs-provisioner reclaim --class <name>` - List GIDs recorded for a class
//! - `efs-provisioner inspect <dir>` - Show a directory's volume metadata
//! - `efs-provisioner resolve --path <nfs path>` - Map a volume to its local directory

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use efs_provisioner::commands::{self, ConfigCommand, ReclaimCommand, ResolveCommand};

/// EFS Provisioner - Per-claim directories on a shared EFS file system
#[derive(Parser)]
#[command(name = "efs-provisioner")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "EFS_PROVISIONER_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "EFS_PROVISIONER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// List the GIDs recorded on disk for a storage class
    #[command(name = "reclaim")]
    Reclaim {
        #[command(flatten)]
        command: ReclaimCommand,
    },

    /// Show the volume metadata stored in a directory
    #[command(name = "inspect")]
    Inspect {
        /// Volume directory
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Map a volume's NFS path to its directory on the local mount
    #[command(name = "resolve")]
    Resolve {
        #[command(flatten)]
        command: ResolveCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level)?;
    debug!("efs-provisioner {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Reclaim { command }) => {
            commands::reclaim::execute(command, cli.config).await
        }
        Some(Commands::Inspect { dir }) => commands::inspect::execute(&dir).await,
        Some(Commands::Resolve { command }) => {
            commands::resolve::execute(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
