// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;

use crate::domain::volume::{PersistentVolume, ProvisionError, ProvisionRequest, ProvisioningState};

/// Volume lifecycle contract driven by the external event loop.
///
/// Calls for different claims may run concurrently; the caller guarantees at
/// most one in-flight call per claim.
#[async_trait]
pub trait VolumeProvisioner: Send + Sync {
    /// Create (or reattach) the directory backing a claim
    async fn provision(
        &self,
        request: &ProvisionRequest,
    ) -> Result<(PersistentVolume, ProvisioningState), ProvisionError>;

    /// Remove the directory backing a previously provisioned volume
    async fn delete(&self, volume: &PersistentVolume) -> Result<(), ProvisionError>;
}
