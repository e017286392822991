// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Volume Directory Store
//!
//! Creates, inspects and removes volume directories on the locally mounted
//! share. Every operation is a blocking filesystem call.
//!
//! **Permissions:**
//! - No GID: `0777`
//! - With GID: `0771` plus the set-group-ID bit, group-owned by the GID
//!
//! The mode is re-applied after creation so the process umask never
//! changes the outcome.

use std::fs::{self, DirBuilder, Permissions};
use std::io::ErrorKind;
use std::os::unix::fs::{DirBuilderExt, MetadataExt, PermissionsExt};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::domain::volume::ProvisionError;

const OPEN_MODE: u32 = 0o777;
const GROUP_MODE: u32 = 0o2771;

/// What occupies a volume's local path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryState {
    Absent,
    /// An existing directory and its current group owner
    Present { gid: u32 },
}

/// Changes the group owner of a directory
pub trait GroupOwnership: Send + Sync {
    fn change_group(&self, path: &Path, gid: u32) -> std::io::Result<()>;
}

/// chown(2) with the owner left untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct ChownGroupOwnership;

impl GroupOwnership for ChownGroupOwnership {
    fn change_group(&self, path: &Path, gid: u32) -> std::io::Result<()> {
        std::os::unix::fs::chown(path, None, Some(gid))
    }
}

pub struct LocalVolumeStore {
    ownership: Arc<dyn GroupOwnership>,
}

impl LocalVolumeStore {
    pub fn new(ownership: Arc<dyn GroupOwnership>) -> Self {
        Self { ownership }
    }

    /// Report whether `path` exists and, if it is a directory, its group.
    pub fn probe(&self, path: &Path) -> Result<DirectoryState, ProvisionError> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(DirectoryState::Present { gid: meta.gid() }),
            Ok(_) => {
                error!("{} already exists but is a file", path.display());
                Err(ProvisionError::NotADirectory {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DirectoryState::Absent),
            Err(e) => {
                error!("Failed to determine if {} already exists: {}", path.display(), e);
                Err(ProvisionError::io("stat", path, e))
            }
        }
    }

    /// Create the directory for a volume.
    ///
    /// Any failure after the directory exists removes it again before the
    /// error is returned.
    pub fn create(&self, path: &Path, gid: Option<u32>) -> Result<(), ProvisionError> {
        let mode = if gid.is_some() { GROUP_MODE } else { OPEN_MODE };

        DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(path)
            .map_err(|e| ProvisionError::io("create directory", path, e))?;

        // umask applies to mkdir
        if let Err(e) = fs::set_permissions(path, Permissions::from_mode(mode)) {
            return Err(self.discard(path, ProvisionError::io("chmod", path, e)));
        }

        if let Some(gid) = gid {
            if let Err(e) = self.ownership.change_group(path, gid) {
                return Err(self.discard(path, ProvisionError::io("change group of", path, e)));
            }
        }

        debug!("created {} with mode {:o} and gid {:?}", path.display(), mode, gid);
        Ok(())
    }

    /// Recursively remove a volume directory. A path that is already gone
    /// counts as removed.
    pub fn remove(&self, path: &Path) -> Result<(), ProvisionError> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} was already removed", path.display());
                Ok(())
            }
            Err(e) => Err(ProvisionError::io("remove", path, e)),
        }
    }

    /// Remove a directory whose initialization failed with `cause`. A failed
    /// removal is reported alongside the cause.
    pub fn discard(&self, path: &Path, cause: ProvisionError) -> ProvisionError {
        warn!("removing partially created {}: {}", path.display(), cause);
        match fs::remove_dir_all(path) {
            Ok(()) => cause,
            Err(source) => ProvisionError::RollbackFailed {
                path: path.to_path_buf(),
                cause: Box::new(cause),
                source,
            },
        }
    }
}

impl Default for LocalVolumeStore {
    fn default() -> Self {
        Self::new(Arc::new(ChownGroupOwnership))
    }
}
