// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! GID Reclaim Command
//!
//! Runs the same scan the provisioner performs at startup and prints the
//! GIDs it would mark as in use for a storage class. Nothing is written.
//!
//! # Usage
//!
//! ```bash
//! efs-provisioner reclaim --class efs-sc
//! efs-provisioner reclaim --class efs-sc --gid-min 40000 --gid-max 50000
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

use efs_provisioner_core::application::resolve_share;
use efs_provisioner_core::domain::gid::GidReclaimer;
use efs_provisioner_core::domain::provisioner_config::ProvisionerConfig;
use efs_provisioner_core::infrastructure::{FileSystemReclaimer, RangeGidTable};

pub const DEFAULT_GID_MIN: u32 = 2000;
pub const DEFAULT_GID_MAX: u32 = i32::MAX as u32;

#[derive(Args)]
pub struct ReclaimCommand {
    /// Storage class whose GIDs are collected
    #[arg(long, value_name = "NAME")]
    class: String,

    /// Lowest GID of the class's range
    #[arg(long, default_value_t = DEFAULT_GID_MIN)]
    gid_min: u32,

    /// Highest GID of the class's range
    #[arg(long, default_value_t = DEFAULT_GID_MAX)]
    gid_max: u32,

    /// Scan this directory instead of the discovered share mount
    #[arg(long, value_name = "DIR")]
    mount_dir: Option<PathBuf>,
}

pub async fn execute(cmd: ReclaimCommand, config_path: Option<PathBuf>) -> Result<()> {
    let base = match cmd.mount_dir {
        Some(dir) => dir,
        None => {
            let config = ProvisionerConfig::load_or_default(config_path)
                .context("Failed to load configuration")?;
            config.validate().context("Configuration validation failed")?;
            resolve_share(&config)?.mountpoint
        }
    };

    println!(
        "Scanning {} for class {}...",
        base.display(),
        cmd.class.bold()
    );

    let gids = reclaim_gids(&base, &cmd.class, cmd.gid_min, cmd.gid_max).await?;

    if gids.is_empty() {
        println!("{}", "No GIDs in use".yellow());
        return Ok(());
    }

    println!("{} GIDs in use:", gids.len());
    for gid in gids {
        println!("  {}", gid);
    }

    Ok(())
}

/// GIDs recorded for `class` under `base`, in ascending order
pub async fn reclaim_gids(base: &Path, class: &str, gid_min: u32, gid_max: u32) -> Result<Vec<u32>> {
    let mut table = RangeGidTable::new(gid_min, gid_max)?;
    FileSystemReclaimer::new(base)
        .reclaim(class, &mut table)
        .await
        .context("Reclaim failed")?;
    Ok(table.allocated().collect())
}
