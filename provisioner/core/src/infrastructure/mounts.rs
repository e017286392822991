// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Mount table discovery
//!
//! Locates the local mountpoint of the share by scanning a
//! `/proc/mounts`-format table for the first entry whose source starts with
//! the share's DNS name.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub mountpoint: PathBuf,
    pub fstype: String,
}

#[derive(Debug, Error)]
pub enum MountError {
    #[error("failed to read mount table {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no mount entry found for {server} among entries {entries}")]
    NotFound { server: String, entries: String },
}

/// Parse the whitespace-separated mount table format. Lines with fewer than
/// three fields are skipped.
pub fn parse_mounts(contents: &str) -> Vec<MountEntry> {
    contents
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let source = fields.next()?;
            let mountpoint = fields.next()?;
            let fstype = fields.next()?;
            Some(MountEntry {
                source: unescape(source),
                mountpoint: PathBuf::from(unescape(mountpoint)),
                fstype: fstype.to_string(),
            })
        })
        .collect()
}

pub fn read_mount_table(path: &Path) -> Result<Vec<MountEntry>, MountError> {
    let contents = std::fs::read_to_string(path).map_err(|source| MountError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = parse_mounts(&contents);
    debug!("read {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// First entry whose source begins with `server`
pub fn find_share_mount<'a>(entries: &'a [MountEntry], server: &str) -> Result<&'a MountEntry, MountError> {
    entries
        .iter()
        .find(|entry| entry.source.starts_with(server))
        .ok_or_else(|| MountError::NotFound {
            server: server.to_string(),
            entries: entries
                .iter()
                .map(|e| format!("{}:{}, ", e.source, e.mountpoint.display()))
                .collect(),
        })
}

/// Decode the `\ooo` octal escapes the kernel uses for whitespace and
/// backslashes in mount fields.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3 && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TABLE: &str = "\
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/nvme0n1p1 / ext4 rw,relatime 0 0
fs-47a2c22e.efs.us-west-2.amazonaws.com:/ /persistentvolumes nfs4 rw,relatime,vers=4.1 0 0
fs-47a2c22e.efs.us-west-2.amazonaws.com:/other /mnt/other nfs4 rw,relatime,vers=4.1 0 0
";

    #[test]
    fn test_first_matching_entry_wins() {
        let entries = parse_mounts(TABLE);
        assert_eq!(entries.len(), 4);

        let entry = find_share_mount(&entries, "fs-47a2c22e.efs.us-west-2.amazonaws.com").unwrap();
        assert_eq!(entry.mountpoint, PathBuf::from("/persistentvolumes"));
        assert_eq!(entry.source, "fs-47a2c22e.efs.us-west-2.amazonaws.com:/");
        assert_eq!(entry.fstype, "nfs4");
    }

    #[test]
    fn test_missing_share_lists_entries() {
        let entries = parse_mounts("proc /proc proc rw 0 0\n");
        let err = find_share_mount(&entries, "fs-1.efs.eu-west-1.amazonaws.com").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("fs-1.efs.eu-west-1.amazonaws.com"));
        assert!(message.contains("proc:/proc, "));
    }

    #[test]
    fn test_octal_escapes_are_decoded() {
        let entries = parse_mounts("server:/a\\040b /mnt/with\\040space nfs4 rw 0 0\n");
        assert_eq!(entries[0].source, "server:/a b");
        assert_eq!(entries[0].mountpoint, PathBuf::from("/mnt/with space"));

        assert_eq!(unescape("back\\134slash"), "back\\slash");
        assert_eq!(unescape("trailing\\04"), "trailing\\04");
        assert_eq!(unescape("not\\999octal"), "not\\999octal");
    }

    #[test]
    fn test_short_lines_are_skipped() {
        let entries = parse_mounts("\nonly-two fields\nsrc /mnt nfs\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, "src");
    }

    #[test]
    fn test_read_mount_table_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TABLE.as_bytes()).unwrap();

        let entries = read_mount_table(file.path()).unwrap();
        assert_eq!(entries.len(), 4);

        let missing = read_mount_table(Path::new("/nonexistent/mounts"));
        assert!(matches!(missing, Err(MountError::Read { .. })));
    }
}
