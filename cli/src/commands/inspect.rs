// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Show the identity record of a volume directory

use anyhow::{Context, Result};
use colored::Colorize;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use efs_provisioner_core::domain::metadata::VolumeMetadata;
use efs_provisioner_core::infrastructure::read_volume_metadata;

pub async fn execute(dir: &Path) -> Result<()> {
    let on_disk_gid = std::fs::metadata(dir)
        .with_context(|| format!("Failed to stat {}", dir.display()))?
        .gid();

    let Some(metadata) = read_volume_metadata(dir)? else {
        println!(
            "{}",
            format!("{} has no volume metadata (unmanaged directory)", dir.display()).yellow()
        );
        return Ok(());
    };

    println!("{}", "Volume metadata:".bold());
    println!("  Claim: {}", metadata.claim_key());
    println!("  Storage class: {}", metadata.storage_class_name);
    println!("  GID: {}", if metadata.gid.is_empty() { "(none)" } else { metadata.gid.as_str() });
    println!("  On-disk GID: {}", on_disk_gid);

    match gid_drift(&metadata, on_disk_gid) {
        Ok(None) => println!("{}", "✓ Directory group matches metadata".green()),
        Ok(Some(recorded)) => println!(
            "{}",
            format!("⚠ Directory group {} differs from recorded GID {}", on_disk_gid, recorded).yellow()
        ),
        Err(e) => println!("{}", format!("✗ {}", e).red()),
    }

    Ok(())
}

/// The recorded GID when it disagrees with the directory's group
fn gid_drift(metadata: &VolumeMetadata, on_disk_gid: u32) -> Result<Option<u32>> {
    Ok(metadata.gid()?.filter(|recorded| *recorded != on_disk_gid))
}
