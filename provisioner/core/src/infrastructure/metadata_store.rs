// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Metadata file persistence
//!
//! Reads and writes the [`VolumeMetadata`] record stored as indented JSON in
//! a hidden file inside each managed directory.

use std::fs::{self, OpenOptions, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::error;

use crate::domain::metadata::{MetadataError, VolumeMetadata, METADATA_FILE_NAME};

/// Owner read/write only
const METADATA_FILE_MODE: u32 = 0o600;

pub fn metadata_path(dir: &Path) -> PathBuf {
    dir.join(METADATA_FILE_NAME)
}

/// Serialize `md` into `dir`, replacing any existing record.
pub fn write_volume_metadata(dir: &Path, md: &VolumeMetadata) -> Result<(), MetadataError> {
    let path = metadata_path(dir);

    let contents = serde_json::to_vec_pretty(md).map_err(|e| {
        error!("failed to marshal metadata: {}", e);
        MetadataError::Encode(e)
    })?;

    // Created owner-only; an existing file is narrowed as well
    let write = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(METADATA_FILE_MODE)
        .open(&path)
        .and_then(|mut file| {
            file.write_all(&contents)?;
            file.set_permissions(Permissions::from_mode(METADATA_FILE_MODE))
        });
    if let Err(source) = write {
        error!("failed to write metadata file {}: {}", path.display(), source);
        return Err(MetadataError::Write { path, source });
    }

    Ok(())
}

/// Read the record stored in `dir`.
///
/// `Ok(None)` means the directory carries no record, which is the normal
/// state for directories created without reuse semantics.
pub fn read_volume_metadata(dir: &Path) -> Result<Option<VolumeMetadata>, MetadataError> {
    let path = metadata_path(dir);

    let contents = match fs::read(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            error!("failed to read metadata file {}: {}", path.display(), source);
            return Err(MetadataError::Read { path, source });
        }
    };

    match serde_json::from_slice(&contents) {
        Ok(md) => Ok(Some(md)),
        Err(source) => {
            error!("failed to unmarshal {}: {}", path.display(), source);
            Err(MetadataError::Decode { path, source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> VolumeMetadata {
        VolumeMetadata {
            gid: "2000".to_string(),
            pvc_name: "alpha".to_string(),
            pvc_namespace: "default".to_string(),
            storage_class_name: "efs-sc".to_string(),
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        write_volume_metadata(dir.path(), &sample()).unwrap();

        let md = read_volume_metadata(dir.path()).unwrap().unwrap();
        assert_eq!(md, sample());
    }

    #[test]
    fn test_file_layout_and_permissions() {
        let dir = TempDir::new().unwrap();
        write_volume_metadata(dir.path(), &sample()).unwrap();

        let path = dir.path().join(".kube-efs-provisioner-metadata");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\n  \"gid\": \"2000\""));
        assert!(contents.contains("\"storageClassName\": \"efs-sc\""));

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_overwrite_replaces_record() {
        let dir = TempDir::new().unwrap();
        write_volume_metadata(dir.path(), &sample()).unwrap();

        let mut updated = sample();
        updated.gid = String::new();
        write_volume_metadata(dir.path(), &updated).unwrap();

        assert_eq!(read_volume_metadata(dir.path()).unwrap(), Some(updated));
    }

    #[test]
    fn test_overwrite_narrows_existing_permissions() {
        let dir = TempDir::new().unwrap();
        let path = metadata_path(dir.path());
        std::fs::write(&path, b"{}").unwrap();
        std::fs::set_permissions(&path, Permissions::from_mode(0o644)).unwrap();

        write_volume_metadata(dir.path(), &sample()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(read_volume_metadata(dir.path()).unwrap(), Some(sample()));
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_volume_metadata(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_garbage_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(metadata_path(dir.path()), b"{not json").unwrap();

        let result = read_volume_metadata(dir.path());
        assert!(matches!(result, Err(MetadataError::Decode { .. })));
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");

        let result = write_volume_metadata(&missing, &sample());
        assert!(matches!(result, Err(MetadataError::Write { .. })));
    }
}
