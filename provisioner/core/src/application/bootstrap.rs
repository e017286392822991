// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Startup wiring
//!
//! Turns a loaded [`ProvisionerConfig`] into the immutable [`ShareConfig`]
//! and the provisioner built on it.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::provisioner::EfsProvisioner;
use crate::domain::gid::GidAllocator;
use crate::domain::provisioner_config::ProvisionerConfig;
use crate::domain::share::{ShareConfig, ShareVerifier};
use crate::infrastructure::mounts::{find_share_mount, read_mount_table};

/// Locate the share: the explicit mount override if configured, otherwise
/// the first mount table entry for the server.
pub fn resolve_share(config: &ProvisionerConfig) -> Result<ShareConfig> {
    let server = config.server_name();

    if let Some(mount) = &config.mount {
        info!("Using configured mount {} at {}", mount.source, mount.mountpoint.display());
        return Ok(ShareConfig::new(server, mount.mountpoint.clone(), mount.source.clone()));
    }

    let entries = read_mount_table(&config.mount_table)
        .with_context(|| format!("Failed to discover the mount for {}", server))?;
    let entry = find_share_mount(&entries, &server)?;

    info!("Found {} mounted at {}", entry.source, entry.mountpoint.display());
    Ok(ShareConfig::new(server, entry.mountpoint.clone(), entry.source.clone()))
}

/// Build a provisioner from configuration. Share verification is
/// best-effort and never fails startup.
pub async fn build_provisioner(
    config: &ProvisionerConfig,
    allocator: Arc<dyn GidAllocator>,
    verifier: &dyn ShareVerifier,
) -> Result<EfsProvisioner> {
    config.validate()?;
    let share = resolve_share(config)?;

    if let Err(e) = verifier.verify(&share).await {
        warn!("Could not confirm that {} exists: {}", share.server, e);
    }

    Ok(EfsProvisioner::new(share, allocator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provisioner_config::MountOverride;
    use crate::domain::share::VerifyError;
    use crate::domain::volume::{PersistentVolume, ProvisionRequest};
    use crate::domain::gid::AllocatorError;
    use async_trait::async_trait;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    struct UnreachableVerifier;

    #[async_trait]
    impl ShareVerifier for UnreachableVerifier {
        async fn verify(&self, share: &ShareConfig) -> Result<(), VerifyError> {
            Err(VerifyError::NoAddresses {
                server: share.server.clone(),
            })
        }
    }

    struct NullAllocator;

    #[async_trait]
    impl GidAllocator for NullAllocator {
        async fn allocate_next(&self, _request: &ProvisionRequest) -> Result<u32, AllocatorError> {
            Err(AllocatorError::Backend("unused".to_string()))
        }

        async fn release(&self, _volume: &PersistentVolume) -> Result<(), AllocatorError> {
            Ok(())
        }

        async fn release_gid(&self, _class_name: &str, _gid: u32) -> Result<(), AllocatorError> {
            Ok(())
        }
    }

    fn config(mount_table: PathBuf) -> ProvisionerConfig {
        ProvisionerConfig {
            provisioner_name: "example.com/aws-efs".to_string(),
            file_system_id: "fs-47a2c22e".to_string(),
            aws_region: "us-west-2".to_string(),
            mount_table,
            ..ProvisionerConfig::default()
        }
    }

    #[test]
    fn test_resolve_share_from_mount_table() {
        let mut table = NamedTempFile::new().unwrap();
        writeln!(table, "proc /proc proc rw 0 0").unwrap();
        writeln!(
            table,
            "fs-47a2c22e.efs.us-west-2.amazonaws.com:/ /persistentvolumes nfs4 rw,vers=4.1 0 0"
        )
        .unwrap();

        let share = resolve_share(&config(table.path().to_path_buf())).unwrap();
        assert_eq!(share.server, "fs-47a2c22e.efs.us-west-2.amazonaws.com");
        assert_eq!(share.mountpoint, PathBuf::from("/persistentvolumes"));
        assert_eq!(share.remote_root(), "/");
    }

    #[test]
    fn test_resolve_share_without_matching_mount() {
        let mut table = NamedTempFile::new().unwrap();
        writeln!(table, "proc /proc proc rw 0 0").unwrap();

        assert!(resolve_share(&config(table.path().to_path_buf())).is_err());
    }

    #[test]
    fn test_mount_override_skips_discovery() {
        let mut config = config(PathBuf::from("/nonexistent/mounts"));
        config.mount = Some(MountOverride {
            mountpoint: PathBuf::from("/srv/efs"),
            source: "fs-47a2c22e.efs.us-west-2.amazonaws.com:/exports".to_string(),
        });

        let share = resolve_share(&config).unwrap();
        assert_eq!(share.mountpoint, PathBuf::from("/srv/efs"));
        assert_eq!(share.remote_root(), "/exports");
    }

    #[tokio::test]
    async fn test_unverified_share_still_builds() {
        let mut config = config(PathBuf::from("/nonexistent/mounts"));
        config.mount = Some(MountOverride {
            mountpoint: PathBuf::from("/srv/efs"),
            source: "fs-47a2c22e.efs.us-west-2.amazonaws.com:/".to_string(),
        });

        let provisioner = build_provisioner(&config, Arc::new(NullAllocator), &UnreachableVerifier)
            .await
            .unwrap();
        assert_eq!(provisioner.share().mountpoint, PathBuf::from("/srv/efs"));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_build() {
        let config = ProvisionerConfig::default();
        let result = build_provisioner(&config, Arc::new(NullAllocator), &UnreachableVerifier).await;
        assert!(result.is_err());
    }
}
