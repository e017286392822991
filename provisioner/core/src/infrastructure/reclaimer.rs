// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! GID table reclamation from on-disk metadata
//!
//! Walks the immediate subdirectories of the share mountpoint and re-marks
//! every GID recorded for the requested class. Individual bad directories
//! are logged and skipped; only a failure to list the mountpoint aborts.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::domain::gid::{GidReclaimer, GidTable, ReclaimError};
use crate::infrastructure::metadata_store::read_volume_metadata;

pub struct FileSystemReclaimer {
    base_path: PathBuf,
}

impl FileSystemReclaimer {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl GidReclaimer for FileSystemReclaimer {
    async fn reclaim(&self, class_name: &str, table: &mut dyn GidTable) -> Result<(), ReclaimError> {
        let entries = std::fs::read_dir(&self.base_path).map_err(|source| {
            error!("failed to list contents of {}: {}", self.base_path.display(), source);
            ReclaimError::ListFailed {
                path: self.base_path.clone(),
                source,
            }
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry in {}: {}", self.base_path.display(), e);
                    continue;
                }
            };

            // Symlinks are not followed
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let dir = entry.path();

            let metadata = match read_volume_metadata(&dir) {
                Ok(Some(metadata)) => metadata,
                Ok(None) => continue,
                Err(e) => {
                    warn!("skipping {}: {}", dir.display(), e);
                    continue;
                }
            };

            if metadata.storage_class_name != class_name || metadata.gid.is_empty() {
                continue;
            }

            let gid = match metadata.gid() {
                Ok(Some(gid)) => gid,
                Ok(None) => continue,
                Err(e) => {
                    error!("{}: {}", dir.display(), e);
                    continue;
                }
            };

            match table.allocate(gid) {
                Ok(()) => debug!("reclaimed gid {} from {}", gid, dir.display()),
                Err(e) if e.is_conflict() => {
                    info!("gid {} found in {} was already allocated", gid, dir.display());
                }
                Err(e) => {
                    error!("failed to allocate gid {} found in {}: {}", gid, dir.display(), e);
                }
            }
        }

        Ok(())
    }
}
