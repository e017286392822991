// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! GID ownership contracts
//!
//! The numeric allocator lives outside this crate. The provisioner draws from
//! and returns to it through [`GidAllocator`], and the reclaimer seeds its
//! per-class table through [`GidTable`] before any request is served.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::volume::{PersistentVolume, ProvisionRequest};

/// Annotation carrying the GID on a provisioned volume
pub const VOLUME_GID_ANNOTATION: &str = "pv.beta.kubernetes.io/gid";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocatorError {
    /// The GID is already marked as in use
    #[error("GID {0} is already allocated")]
    Conflict(u32),

    #[error("GID {gid} is outside the range {min}-{max}")]
    OutOfRange { gid: u32, min: u32, max: u32 },

    #[error("no GIDs remain in the range {min}-{max}")]
    Exhausted { min: u32, max: u32 },

    #[error("invalid GID range: min {min} is greater than max {max}")]
    InvalidRange { min: u32, max: u32 },

    #[error("invalid value '{0}' for annotation pv.beta.kubernetes.io/gid")]
    InvalidAnnotation(String),

    #[error("GID allocator backend failure: {0}")]
    Backend(String),
}

impl AllocatorError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// External per-class GID allocator
#[async_trait]
pub trait GidAllocator: Send + Sync {
    /// Reserve the next free GID for the request's class
    async fn allocate_next(&self, request: &ProvisionRequest) -> Result<u32, AllocatorError>;

    /// Return the GID recorded on a volume, if any
    async fn release(&self, volume: &PersistentVolume) -> Result<(), AllocatorError>;

    /// Return a GID that was reserved but never recorded on a volume
    async fn release_gid(&self, class_name: &str, gid: u32) -> Result<(), AllocatorError>;
}

/// Set of GIDs considered in use for one class
pub trait GidTable: Send {
    /// Mark a specific GID as in use. An already-taken GID yields
    /// [`AllocatorError::Conflict`].
    fn allocate(&mut self, gid: u32) -> Result<(), AllocatorError>;

    fn release(&mut self, gid: u32) -> Result<(), AllocatorError>;

    fn is_allocated(&self, gid: u32) -> bool;
}

#[derive(Debug, Error)]
pub enum ReclaimError {
    #[error("failed to list contents of {}: {source}", .path.display())]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Rebuilds a class's GID table from state that outlives the process
#[async_trait]
pub trait GidReclaimer: Send + Sync {
    async fn reclaim(&self, class_name: &str, table: &mut dyn GidTable) -> Result<(), ReclaimError>;
}

/// GID recorded on a volume descriptor, if any
pub fn volume_gid(volume: &PersistentVolume) -> Result<Option<u32>, AllocatorError> {
    match volume.annotations.get(VOLUME_GID_ANNOTATION) {
        Some(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| AllocatorError::InvalidAnnotation(value.clone())),
        None => Ok(None),
    }
}
