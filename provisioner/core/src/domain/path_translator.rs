// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path Translator Domain Service
//!
//! Derives the directory a claim maps to, both as seen through the local
//! mount and as seen by clients of the remote share, and maps a recorded
//! remote path back to the local directory on delete.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure string/path arithmetic over a [`ShareConfig`]; no I/O

use std::path::PathBuf;

use crate::domain::share::{PathError, ShareConfig};
use crate::domain::volume::{NfsVolumeSource, ParameterError, ProvisionRequest};

/// Lexically clean a slash-separated path.
///
/// Collapses repeated separators, drops `.` elements and resolves `..`
/// against the preceding element. A `..` at the root of a rooted path is
/// dropped. The empty path cleans to `"."`.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

pub struct PathTranslator {
    share: ShareConfig,
}

impl PathTranslator {
    pub fn new(share: ShareConfig) -> Self {
        Self { share }
    }

    pub fn share(&self) -> &ShareConfig {
        &self.share
    }

    /// Name of the directory to create for a request.
    ///
    /// In reuse mode the name is `[prefix-]claim-namespace`, so retries and
    /// re-created claims land on the same directory. Otherwise it is
    /// `claim-pvName`, unique per attempt.
    pub fn directory_name(&self, request: &ProvisionRequest) -> Result<String, ParameterError> {
        if request.storage_class.reuse_volumes()? {
            let prefix = request.storage_class.volume_prefix();
            let prefix = if prefix.is_empty() {
                String::new()
            } else {
                format!("{}-", prefix)
            };
            return Ok(format!(
                "{}{}-{}",
                prefix, request.claim.name, request.claim.namespace
            ));
        }

        Ok(format!("{}-{}", request.claim.name, request.pv_name))
    }

    pub fn local_path(&self, request: &ProvisionRequest) -> Result<PathBuf, ParameterError> {
        let dirname = self.directory_name(request)?;
        Ok(self.share.mountpoint.join(dirname))
    }

    pub fn remote_path(&self, request: &ProvisionRequest) -> Result<String, ParameterError> {
        let dirname = self.directory_name(request)?;
        Ok(clean_path(&format!("{}/{}", self.share.remote_root(), dirname)))
    }

    /// Map a volume's recorded remote location back to its local directory.
    ///
    /// The server must be ours and the cleaned path must lie strictly below
    /// the remote root; the share root itself is never a volume.
    pub fn local_path_for(&self, nfs: &NfsVolumeSource) -> Result<PathBuf, PathError> {
        if nfs.server != self.share.server {
            return Err(PathError::ServerMismatch {
                found: nfs.server.clone(),
                expected: self.share.server.clone(),
            });
        }

        let root = self.share.remote_root();
        let path = clean_path(&nfs.path);

        let not_a_child = || PathError::NotAChild {
            path: nfs.path.clone(),
            source_path: self.share.source.clone(),
            mountpoint: self.share.mountpoint.clone(),
        };

        let subpath = path.strip_prefix(root.as_str()).ok_or_else(not_a_child)?;
        let is_child = if root.ends_with('/') {
            !subpath.is_empty()
        } else {
            subpath.starts_with('/') && subpath.len() > 1
        };
        if !is_child {
            return Err(not_a_child());
        }

        Ok(self.share.mountpoint.join(subpath.trim_start_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::volume::{StorageClassSpec, VolumeClaim};

    const SERVER: &str = "fs-1234.efs.us-east-1.amazonaws.com";

    fn translator(source: &str) -> PathTranslator {
        PathTranslator::new(ShareConfig::new(SERVER, "/persistentvolumes", source))
    }

    fn request(class: StorageClassSpec) -> ProvisionRequest {
        ProvisionRequest::new("pvc-0f1e2d", VolumeClaim::new("alpha", "default"), class)
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("/"), "/");
        assert_eq!(clean_path("//a//b/"), "/a/b");
        assert_eq!(clean_path("/a/./b/../c"), "/a/c");
        assert_eq!(clean_path("/../a"), "/a");
        assert_eq!(clean_path("a/../../b"), "../b");
        assert_eq!(clean_path("a/.."), ".");
    }

    #[test]
    fn test_directory_name_without_reuse() {
        let t = translator(&format!("{}:/", SERVER));
        let name = t.directory_name(&request(StorageClassSpec::new("efs-sc"))).unwrap();
        assert_eq!(name, "alpha-pvc-0f1e2d");
    }

    #[test]
    fn test_directory_name_with_reuse_and_prefix() {
        let t = translator(&format!("{}:/", SERVER));
        let class = StorageClassSpec::new("efs-sc").with_parameter("reuseVolumes", "true");
        assert_eq!(t.directory_name(&request(class.clone())).unwrap(), "alpha-default");

        let class = class.with_parameter("volumePrefix", "team");
        assert_eq!(t.directory_name(&request(class)).unwrap(), "team-alpha-default");
    }

    #[test]
    fn test_directory_name_rejects_bad_reuse_flag() {
        let t = translator(&format!("{}:/", SERVER));
        let class = StorageClassSpec::new("efs-sc").with_parameter("reuseVolumes", "maybe");
        assert!(t.directory_name(&request(class)).is_err());
    }

    #[test]
    fn test_local_and_remote_paths() {
        let t = translator(&format!("{}:/exports/", SERVER));
        let req = request(StorageClassSpec::new("efs-sc"));
        assert_eq!(
            t.local_path(&req).unwrap(),
            PathBuf::from("/persistentvolumes/alpha-pvc-0f1e2d")
        );
        assert_eq!(t.remote_path(&req).unwrap(), "/exports/alpha-pvc-0f1e2d");
    }

    #[test]
    fn test_inverse_mapping_round_trips() {
        let t = translator(&format!("{}:/exports", SERVER));
        let req = request(StorageClassSpec::new("efs-sc"));
        let nfs = NfsVolumeSource {
            server: SERVER.to_string(),
            path: t.remote_path(&req).unwrap(),
            read_only: false,
        };
        assert_eq!(t.local_path_for(&nfs).unwrap(), t.local_path(&req).unwrap());
    }

    #[test]
    fn test_inverse_mapping_from_share_root() {
        let t = translator(&format!("{}:/", SERVER));
        let nfs = NfsVolumeSource {
            server: SERVER.to_string(),
            path: "/alpha-default".to_string(),
            read_only: false,
        };
        assert_eq!(
            t.local_path_for(&nfs).unwrap(),
            PathBuf::from("/persistentvolumes/alpha-default")
        );
    }

    #[test]
    fn test_inverse_mapping_rejects_foreign_server() {
        let t = translator(&format!("{}:/", SERVER));
        let nfs = NfsVolumeSource {
            server: "other.example.com".to_string(),
            path: "/alpha-default".to_string(),
            read_only: false,
        };
        assert!(matches!(t.local_path_for(&nfs), Err(PathError::ServerMismatch { .. })));
    }

    #[test]
    fn test_inverse_mapping_rejects_non_children() {
        let t = translator(&format!("{}:/exports", SERVER));
        for path in ["/other/alpha", "/exports", "/exports/", "/exportsfoo/alpha", "/exports/../etc"] {
            let nfs = NfsVolumeSource {
                server: SERVER.to_string(),
                path: path.to_string(),
                read_only: false,
            };
            assert!(
                matches!(t.local_path_for(&nfs), Err(PathError::NotAChild { .. })),
                "{} should not map to a local directory",
                path
            );
        }
    }
}
