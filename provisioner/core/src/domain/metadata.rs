// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Volume Identity Record
//!
//! The record persisted inside every directory created under reuse
//! semantics. It is the only thing consulted when deciding whether an
//! existing directory may be handed to a new claim, and when rebuilding
//! the GID table after a restart.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::volume::VolumeClaim;

/// Hidden file holding the record, relative to the volume directory
pub const METADATA_FILE_NAME: &str = ".kube-efs-provisioner-metadata";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeMetadata {
    /// Decimal GID, or empty when no GID was allocated
    pub gid: String,
    pub pvc_name: String,
    pub pvc_namespace: String,
    pub storage_class_name: String,
}

impl VolumeMetadata {
    pub fn new(gid: Option<u32>, claim: &VolumeClaim) -> Self {
        Self {
            gid: gid.map(|g| g.to_string()).unwrap_or_default(),
            pvc_name: claim.name.clone(),
            pvc_namespace: claim.namespace.clone(),
            storage_class_name: claim.class_name().to_string(),
        }
    }

    /// The recorded GID. A value that is not an unsigned 32-bit integer is
    /// reported as corruption rather than treated as absent.
    pub fn gid(&self) -> Result<Option<u32>, MetadataError> {
        if self.gid.is_empty() {
            return Ok(None);
        }
        self.gid
            .parse::<u32>()
            .map(Some)
            .map_err(|_| MetadataError::InvalidGid(self.gid.clone()))
    }

    /// `namespace/name` of the claim that created the directory
    pub fn claim_key(&self) -> String {
        format!("{}/{}", self.pvc_namespace, self.pvc_name)
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read metadata file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write metadata file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to unmarshal {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to marshal metadata: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("volume metadata contains an invalid GID value '{0}'")]
    InvalidGid(String),
}
