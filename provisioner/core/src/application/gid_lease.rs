// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scoped GID reservation
//!
//! A [`GidLease`] owns a GID drawn from the allocator until the caller
//! either commits it (the GID now belongs to a volume) or rolls it back
//! (the GID is returned to the allocator). Release is asynchronous, so it
//! cannot happen in `Drop`; a lease dropped unsettled only logs the leak.

use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::domain::gid::{AllocatorError, GidAllocator};
use crate::domain::volume::ProvisionRequest;

pub struct GidLease {
    allocator: Arc<dyn GidAllocator>,
    class_name: String,
    gid: u32,
    settled: bool,
}

impl GidLease {
    /// Draw the next GID for the request's class
    pub async fn acquire(
        allocator: Arc<dyn GidAllocator>,
        request: &ProvisionRequest,
    ) -> Result<Self, AllocatorError> {
        let gid = allocator.allocate_next(request).await?;
        debug!("leased gid {} for claim {}/{}", gid, request.claim.namespace, request.claim.name);
        Ok(Self {
            allocator,
            class_name: request.claim.class_name().to_string(),
            gid,
            settled: false,
        })
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    /// Keep the GID; it is now recorded on a volume
    pub fn commit(mut self) -> u32 {
        self.settled = true;
        self.gid
    }

    /// Return the GID to the allocator. A failed release is logged; the
    /// caller is already on an error path.
    pub async fn rollback(mut self) {
        self.settled = true;
        match self.allocator.release_gid(&self.class_name, self.gid).await {
            Ok(()) => debug!("released leased gid {}", self.gid),
            Err(e) => error!(
                "failed to release gid {} for class {}: {}",
                self.gid, self.class_name, e
            ),
        }
    }
}

impl Drop for GidLease {
    fn drop(&mut self) {
        if !self.settled {
            warn!(
                "gid {} for class {} was neither committed nor released",
                self.gid, self.class_name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::volume::{PersistentVolume, StorageClassSpec, VolumeClaim};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingAllocator {
        released: Mutex<Vec<(String, u32)>>,
    }

    #[async_trait]
    impl GidAllocator for CountingAllocator {
        async fn allocate_next(&self, _request: &ProvisionRequest) -> Result<u32, AllocatorError> {
            Ok(2000)
        }

        async fn release(&self, _volume: &PersistentVolume) -> Result<(), AllocatorError> {
            Ok(())
        }

        async fn release_gid(&self, class_name: &str, gid: u32) -> Result<(), AllocatorError> {
            self.released.lock().unwrap().push((class_name.to_string(), gid));
            Ok(())
        }
    }

    fn request() -> ProvisionRequest {
        let mut claim = VolumeClaim::new("alpha", "default");
        claim.storage_class_name = Some("efs-sc".to_string());
        ProvisionRequest::new("pvc-1", claim, StorageClassSpec::new("efs-sc"))
    }

    #[tokio::test]
    async fn test_commit_keeps_gid() {
        let allocator = Arc::new(CountingAllocator::default());
        let lease = GidLease::acquire(allocator.clone(), &request()).await.unwrap();
        assert_eq!(lease.gid(), 2000);
        assert_eq!(lease.commit(), 2000);
        assert!(allocator.released.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_releases_gid() {
        let allocator = Arc::new(CountingAllocator::default());
        let lease = GidLease::acquire(allocator.clone(), &request()).await.unwrap();
        lease.rollback().await;
        assert_eq!(
            *allocator.released.lock().unwrap(),
            vec![("efs-sc".to_string(), 2000)]
        );
    }
}
