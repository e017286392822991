// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Remote share identity
//!
//! The share the provisioner carves volumes out of is described once at
//! startup by a [`ShareConfig`] and passed by value into every component
//! that needs it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::path_translator::clean_path;

/// Immutable description of the mounted share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Server identity recorded on every volume (the share's DNS name)
    pub server: String,

    /// Where the share is mounted inside the provisioner
    pub mountpoint: PathBuf,

    /// Mount source string, e.g. "fs-1234.efs.us-east-1.amazonaws.com:/"
    pub source: String,
}

impl ShareConfig {
    pub fn new(server: impl Into<String>, mountpoint: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            mountpoint: mountpoint.into(),
            source: source.into(),
        }
    }

    /// Export path on the server that the mountpoint corresponds to.
    ///
    /// The first `<server>:` occurrence is stripped from the mount source and
    /// the remainder is cleaned.
    pub fn remote_root(&self) -> String {
        let prefix = format!("{}:", self.server);
        clean_path(&self.source.replacen(&prefix, "", 1))
    }
}

/// Errors raised when mapping a recorded remote path back to a directory
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("volume's NFS server {found} is not equal to the server {expected} from which this provisioner creates volumes")]
    ServerMismatch { found: String, expected: String },

    #[error("volume's NFS path {path} is not a child of the server path {source_path} mounted in this provisioner at {}", .mountpoint.display())]
    NotAChild {
        path: String,
        source_path: String,
        mountpoint: PathBuf,
    },
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("could not resolve {server}: {reason}")]
    Unresolvable { server: String, reason: String },

    #[error("{server} resolved to no addresses")]
    NoAddresses { server: String },
}

/// Best-effort confirmation that the backing share exists
#[async_trait]
pub trait ShareVerifier: Send + Sync {
    async fn verify(&self, share: &ShareConfig) -> Result<(), VerifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_root_strips_server_prefix() {
        let share = ShareConfig::new(
            "fs-1234.efs.us-east-1.amazonaws.com",
            "/persistentvolumes",
            "fs-1234.efs.us-east-1.amazonaws.com:/",
        );
        assert_eq!(share.remote_root(), "/");

        let share = ShareConfig::new(
            "fs-1234.efs.us-east-1.amazonaws.com",
            "/persistentvolumes",
            "fs-1234.efs.us-east-1.amazonaws.com:/exports//team/",
        );
        assert_eq!(share.remote_root(), "/exports/team");
    }
}
