// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Volume Lifecycle Application Service
//!
//! Orchestrates provisioning and deletion coordinating:
//! - Domain layer: PathTranslator, VolumeMetadata, GidAllocator trait
//! - Infrastructure layer: LocalVolumeStore, metadata file, FileSystemReclaimer
//!
//! One [`EfsProvisioner`] satisfies both [`VolumeProvisioner`] and
//! [`GidReclaimer`].

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::application::gid_lease::GidLease;
use crate::domain::gid::{GidAllocator, GidReclaimer, GidTable, ReclaimError, VOLUME_GID_ANNOTATION};
use crate::domain::metadata::VolumeMetadata;
use crate::domain::path_translator::PathTranslator;
use crate::domain::provisioner::VolumeProvisioner;
use crate::domain::share::ShareConfig;
use crate::domain::volume::{
    NfsVolumeSource, PersistentVolume, ProvisionError, ProvisionRequest, ProvisioningState,
};
use crate::infrastructure::metadata_store::{read_volume_metadata, write_volume_metadata};
use crate::infrastructure::reclaimer::FileSystemReclaimer;
use crate::infrastructure::volume_store::{DirectoryState, LocalVolumeStore};

pub struct EfsProvisioner {
    translator: PathTranslator,
    allocator: Arc<dyn GidAllocator>,
    store: LocalVolumeStore,
    reclaimer: FileSystemReclaimer,
}

impl EfsProvisioner {
    pub fn new(share: ShareConfig, allocator: Arc<dyn GidAllocator>) -> Self {
        let reclaimer = FileSystemReclaimer::new(share.mountpoint.clone());
        Self {
            translator: PathTranslator::new(share),
            allocator,
            store: LocalVolumeStore::default(),
            reclaimer,
        }
    }

    /// Replace the directory store, e.g. to change how group ownership is set
    pub fn with_volume_store(mut self, store: LocalVolumeStore) -> Self {
        self.store = store;
        self
    }

    pub fn share(&self) -> &ShareConfig {
        self.translator.share()
    }

    async fn create(&self, request: &ProvisionRequest) -> Result<PersistentVolume, ProvisionError> {
        if request.claim.selector.is_some() {
            return Err(ProvisionError::UnsupportedSelector);
        }

        let local_path = self.translator.local_path(request)?;
        let reuse = request.storage_class.reuse_volumes()?;

        let adopted = if reuse {
            match self.store.probe(&local_path)? {
                DirectoryState::Present { gid } => Some(self.adopt(request, &local_path, gid)?),
                DirectoryState::Absent => None,
            }
        } else {
            None
        };

        let gid = match adopted {
            Some(gid) => gid,
            None => self.create_fresh(request, &local_path, reuse).await?,
        };

        let remote_path = self.translator.remote_path(request)?;

        let mut annotations = BTreeMap::new();
        if let Some(gid) = gid {
            annotations.insert(VOLUME_GID_ANNOTATION.to_string(), gid.to_string());
        }

        Ok(PersistentVolume {
            name: request.pv_name.clone(),
            annotations,
            storage_class_name: request.claim.class_name().to_string(),
            reclaim_policy: request.storage_class.reclaim_policy,
            access_modes: request.claim.access_modes.clone(),
            capacity: request.claim.requested_storage.clone(),
            nfs: NfsVolumeSource {
                server: self.share().server.clone(),
                path: remote_path,
                read_only: false,
            },
            mount_options: request.storage_class.effective_mount_options(),
        })
    }

    /// Validate an existing directory against the request and return the
    /// GID it already carries.
    fn adopt(
        &self,
        request: &ProvisionRequest,
        path: &Path,
        actual_gid: u32,
    ) -> Result<Option<u32>, ProvisionError> {
        let metadata = read_volume_metadata(path)?.ok_or_else(|| ProvisionError::UnmanagedDirectory {
            path: path.to_path_buf(),
        })?;

        let requested_class = request.claim.class_name();
        if metadata.storage_class_name != requested_class {
            return Err(ProvisionError::ClassMismatch {
                path: path.to_path_buf(),
                recorded: metadata.storage_class_name,
                requested: requested_class.to_string(),
            });
        }

        if metadata.pvc_name != request.claim.name || metadata.pvc_namespace != request.claim.namespace {
            return Err(ProvisionError::ClaimMismatch {
                path: path.to_path_buf(),
                recorded: metadata.claim_key(),
                requested: format!("{}/{}", request.claim.namespace, request.claim.name),
            });
        }

        let gid = metadata.gid()?;
        if let Some(recorded) = gid {
            if recorded != actual_gid {
                return Err(ProvisionError::GidDrift {
                    path: path.to_path_buf(),
                    actual: actual_gid,
                    recorded,
                });
            }
        }

        info!("reusing existing directory {} with gid {:?}", path.display(), gid);
        Ok(gid)
    }

    async fn create_fresh(
        &self,
        request: &ProvisionRequest,
        path: &Path,
        reuse: bool,
    ) -> Result<Option<u32>, ProvisionError> {
        let lease = if request.storage_class.gid_allocate()? {
            Some(GidLease::acquire(self.allocator.clone(), request).await?)
        } else {
            None
        };

        let gid = lease.as_ref().map(GidLease::gid);
        if let Err(e) = self.initialize(request, path, gid, reuse) {
            if let Some(lease) = lease {
                lease.rollback().await;
            }
            return Err(e);
        }

        debug!("created {} for claim {}/{}", path.display(), request.claim.namespace, request.claim.name);
        Ok(lease.map(GidLease::commit))
    }

    fn initialize(
        &self,
        request: &ProvisionRequest,
        path: &Path,
        gid: Option<u32>,
        reuse: bool,
    ) -> Result<(), ProvisionError> {
        self.store.create(path, gid)?;

        if reuse {
            let metadata = VolumeMetadata::new(gid, &request.claim);
            if let Err(e) = write_volume_metadata(path, &metadata) {
                return Err(self.store.discard(path, e.into()));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl VolumeProvisioner for EfsProvisioner {
    async fn provision(
        &self,
        request: &ProvisionRequest,
    ) -> Result<(PersistentVolume, ProvisioningState), ProvisionError> {
        match self.create(request).await {
            Ok(volume) => {
                info!("provisioned volume {} at {}", volume.name, volume.nfs.path);
                Ok((volume, ProvisioningState::Finished))
            }
            Err(e) => {
                error!(
                    "failed to provision volume {} for claim {}/{} (state {:?}): {}",
                    request.pv_name,
                    request.claim.namespace,
                    request.claim.name,
                    e.provisioning_state(),
                    e
                );
                Err(e)
            }
        }
    }

    async fn delete(&self, volume: &PersistentVolume) -> Result<(), ProvisionError> {
        info!("Deleting volume {}", volume.name);

        if let Err(e) = self.allocator.release(volume).await {
            error!("failed to release gid of volume {}: {}", volume.name, e);
            return Err(e.into());
        }

        let path = self.translator.local_path_for(&volume.nfs).map_err(|e| {
            error!("{}", e);
            ProvisionError::from(e)
        })?;

        self.store.remove(&path).map_err(|e| {
            error!("failed to delete volume {}: {}", volume.name, e);
            e
        })?;

        info!("Volume {} deleted successfully", volume.name);
        Ok(())
    }
}

#[async_trait]
impl GidReclaimer for EfsProvisioner {
    async fn reclaim(&self, class_name: &str, table: &mut dyn GidTable) -> Result<(), ReclaimError> {
        self.reclaimer.reclaim(class_name, table).await
    }
}
