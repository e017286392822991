// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use tracing::debug;

use crate::domain::share::{ShareConfig, ShareVerifier, VerifyError};

/// NFS port the share's DNS name is resolved against
const NFS_PORT: u16 = 2049;

/// Confirms the share's DNS name resolves to at least one address
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsShareVerifier;

#[async_trait]
impl ShareVerifier for DnsShareVerifier {
    async fn verify(&self, share: &ShareConfig) -> Result<(), VerifyError> {
        let mut addrs = tokio::net::lookup_host((share.server.as_str(), NFS_PORT))
            .await
            .map_err(|e| VerifyError::Unresolvable {
                server: share.server.clone(),
                reason: e.to_string(),
            })?;

        match addrs.next() {
            Some(addr) => {
                debug!("{} resolves to {}", share.server, addr);
                Ok(())
            }
            None => Err(VerifyError::NoAddresses {
                server: share.server.clone(),
            }),
        }
    }
}
