// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Map a volume's recorded NFS location to its directory on the local mount

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use efs_provisioner_core::application::resolve_share;
use efs_provisioner_core::domain::path_translator::PathTranslator;
use efs_provisioner_core::domain::provisioner_config::ProvisionerConfig;
use efs_provisioner_core::domain::share::ShareConfig;
use efs_provisioner_core::domain::volume::NfsVolumeSource;

#[derive(Args)]
pub struct ResolveCommand {
    /// NFS server recorded on the volume (default: this provisioner's server)
    #[arg(long)]
    server: Option<String>,

    /// NFS path recorded on the volume
    #[arg(long)]
    path: String,
}

pub async fn execute(cmd: ResolveCommand, config_path: Option<PathBuf>) -> Result<()> {
    let config = ProvisionerConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let share = resolve_share(&config)?;
    let local = resolve(share, cmd.server, cmd.path)?;
    println!("{}", local.display());

    Ok(())
}

fn resolve(share: ShareConfig, server: Option<String>, path: String) -> Result<PathBuf> {
    let nfs = NfsVolumeSource {
        server: server.unwrap_or_else(|| share.server.clone()),
        path,
        read_only: false,
    };
    let local = PathTranslator::new(share).local_path_for(&nfs)?;
    Ok(local)
}
