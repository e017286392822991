// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::gid::AllocatorError;
use crate::domain::metadata::MetadataError;
use crate::domain::share::PathError;

/// Legacy claim annotation that takes precedence over `storageClassName`
pub const STORAGE_CLASS_ANNOTATION: &str = "volume.beta.kubernetes.io/storage-class";

/// Mount options used when the class does not configure any
pub const DEFAULT_MOUNT_OPTIONS: &[&str] = &["vers=4.1"];

/// Class parameter keys understood by the provisioner
pub mod params {
    pub const REUSE_VOLUMES: &str = "reuseVolumes";
    pub const VOLUME_PREFIX: &str = "volumePrefix";
    pub const GID_ALLOCATE: &str = "gidallocate";
}

// ============================================================================
// Value Objects
// ============================================================================

/// Volume access mode as requested by a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadOnlyMany,
    ReadWriteMany,
}

/// What happens to the backing directory once the volume is released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReclaimPolicy {
    #[default]
    Delete,
    Retain,
    Recycle,
}

/// Label selector attached to a claim. Only its presence matters here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

/// A request for a logical volume, identified by name and namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeClaim {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
    #[serde(default)]
    pub access_modes: Vec<AccessMode>,
    /// Requested capacity as a resource quantity (e.g. "5Gi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_storage: Option<String>,
}

impl VolumeClaim {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Resolve the class this claim asked for.
    ///
    /// The beta annotation wins over `storageClassName`; a claim with neither
    /// belongs to the empty class.
    pub fn class_name(&self) -> &str {
        if let Some(class) = self.annotations.get(STORAGE_CLASS_ANNOTATION) {
            return class;
        }
        self.storage_class_name.as_deref().unwrap_or("")
    }
}

/// Class configuration in effect for a provisioning request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageClassSpec {
    pub name: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_options: Option<Vec<String>>,
    #[serde(default)]
    pub reclaim_policy: ReclaimPolicy,
}

impl StorageClassSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// `reuseVolumes`, default false
    pub fn reuse_volumes(&self) -> Result<bool, ParameterError> {
        match self.parameters.get(params::REUSE_VOLUMES) {
            Some(value) => parse_bool(params::REUSE_VOLUMES, value),
            None => Ok(false),
        }
    }

    /// `gidAllocate`, default true. The key is matched case-insensitively.
    pub fn gid_allocate(&self) -> Result<bool, ParameterError> {
        let mut allocate = true;
        for (key, value) in &self.parameters {
            if key.to_lowercase() == params::GID_ALLOCATE {
                allocate = parse_bool(key, value)?;
            }
        }
        Ok(allocate)
    }

    /// `volumePrefix`, empty when unset
    pub fn volume_prefix(&self) -> &str {
        self.parameters
            .get(params::VOLUME_PREFIX)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn effective_mount_options(&self) -> Vec<String> {
        match &self.mount_options {
            Some(options) => options.clone(),
            None => DEFAULT_MOUNT_OPTIONS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

/// Everything the event loop hands over for one provisioning attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    /// Generated, never reused volume name
    pub pv_name: String,
    pub claim: VolumeClaim,
    pub storage_class: StorageClassSpec,
}

impl ProvisionRequest {
    pub fn new(pv_name: impl Into<String>, claim: VolumeClaim, storage_class: StorageClassSpec) -> Self {
        Self {
            pv_name: pv_name.into(),
            claim,
            storage_class,
        }
    }
}

/// Remote share location recorded on a provisioned volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfsVolumeSource {
    pub server: String,
    pub path: String,
    #[serde(default)]
    pub read_only: bool,
}

/// Volume descriptor returned by provisioning and handed back on delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolume {
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub storage_class_name: String,
    pub reclaim_policy: ReclaimPolicy,
    #[serde(default)]
    pub access_modes: Vec<AccessMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    pub nfs: NfsVolumeSource,
    #[serde(default)]
    pub mount_options: Vec<String>,
}

/// Tri-state outcome reported back to the event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisioningState {
    /// The volume is fully provisioned
    Finished,
    /// Nothing changed; the caller may retry later
    NoChange,
    /// Provisioning continues in the background
    InBackground,
}

/// Parse a boolean class parameter using the accepted spellings
/// (`1 t T TRUE true True` / `0 f F FALSE false False`).
pub fn parse_bool(parameter: &str, value: &str) -> Result<bool, ParameterError> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(ParameterError {
            parameter: parameter.to_string(),
            value: value.to_string(),
        }),
    }
}

// ============================================================================
// Domain Errors
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value '{value}' for parameter {parameter}")]
pub struct ParameterError {
    pub parameter: String,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("claim.Spec.Selector is not supported")]
    UnsupportedSelector,

    #[error(transparent)]
    InvalidParameter(#[from] ParameterError),

    #[error("{} already exists but is not a directory", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("{} already exists but has no volume metadata", .path.display())]
    UnmanagedDirectory { path: PathBuf },

    #[error(
        "{} already exists but was created for storage class {recorded} instead of the currently requested storage class of {requested}",
        .path.display()
    )]
    ClassMismatch {
        path: PathBuf,
        recorded: String,
        requested: String,
    },

    #[error(
        "{} already exists but was created for claim {recorded} instead of the currently requested claim {requested}",
        .path.display()
    )]
    ClaimMismatch {
        path: PathBuf,
        recorded: String,
        requested: String,
    },

    #[error("{} already exists, but its gid is {actual} while the volume metadata says the gid should be {recorded}", .path.display())]
    GidDrift {
        path: PathBuf,
        actual: u32,
        recorded: u32,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Allocator(#[from] AllocatorError),

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{cause}; removing {} afterwards also failed: {source}", .path.display())]
    RollbackFailed {
        path: PathBuf,
        cause: Box<ProvisionError>,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Outcome to report alongside this error. Nothing was provisioned.
    pub fn provisioning_state(&self) -> ProvisioningState {
        ProvisioningState::NoChange
    }

    /// True when an existing directory belongs to another logical volume
    pub fn is_identity_conflict(&self) -> bool {
        matches!(
            self,
            Self::ClassMismatch { .. } | Self::ClaimMismatch { .. } | Self::UnmanagedDirectory { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepted_spellings() {
        for value in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool("reuseVolumes", value), Ok(true), "{}", value);
        }
        for value in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool("reuseVolumes", value), Ok(false), "{}", value);
        }
    }

    #[test]
    fn test_parse_bool_rejects_other_values() {
        let err = parse_bool("reuseVolumes", "yes").unwrap_err();
        assert_eq!(err.parameter, "reuseVolumes");
        assert_eq!(err.to_string(), "invalid value 'yes' for parameter reuseVolumes");
    }

    #[test]
    fn test_class_parameter_defaults() {
        let class = StorageClassSpec::new("efs-sc");
        assert!(!class.reuse_volumes().unwrap());
        assert!(class.gid_allocate().unwrap());
        assert_eq!(class.volume_prefix(), "");
        assert_eq!(class.effective_mount_options(), vec!["vers=4.1".to_string()]);
    }

    #[test]
    fn test_gid_allocate_key_is_case_insensitive() {
        let class = StorageClassSpec::new("efs-sc").with_parameter("GidAllocate", "false");
        assert!(!class.gid_allocate().unwrap());

        let class = StorageClassSpec::new("efs-sc").with_parameter("gidAllocate", "nope");
        assert!(class.gid_allocate().is_err());
    }

    #[test]
    fn test_configured_mount_options_win() {
        let mut class = StorageClassSpec::new("efs-sc");
        class.mount_options = Some(vec!["vers=4.0".to_string(), "hard".to_string()]);
        assert_eq!(class.effective_mount_options(), vec!["vers=4.0", "hard"]);
    }

    #[test]
    fn test_claim_class_name_precedence() {
        let mut claim = VolumeClaim::new("alpha", "default");
        assert_eq!(claim.class_name(), "");

        claim.storage_class_name = Some("efs-sc".to_string());
        assert_eq!(claim.class_name(), "efs-sc");

        claim
            .annotations
            .insert(STORAGE_CLASS_ANNOTATION.to_string(), "legacy-sc".to_string());
        assert_eq!(claim.class_name(), "legacy-sc");
    }

    #[test]
    fn test_identity_conflict_classification() {
        let conflict = ProvisionError::ClassMismatch {
            path: PathBuf::from("/efs/alpha-default"),
            recorded: "A".to_string(),
            requested: "B".to_string(),
        };
        assert!(conflict.is_identity_conflict());
        assert_eq!(conflict.provisioning_state(), ProvisioningState::NoChange);
        assert!(!ProvisionError::UnsupportedSelector.is_identity_conflict());
    }
}
