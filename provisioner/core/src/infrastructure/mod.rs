// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod gid_table;
pub mod metadata_store;
pub mod mounts;
pub mod reclaimer;
pub mod share_verifier;
pub mod volume_store;

pub use gid_table::RangeGidTable;
pub use metadata_store::{read_volume_metadata, write_volume_metadata};
pub use mounts::{find_share_mount, read_mount_table, MountEntry, MountError};
pub use reclaimer::FileSystemReclaimer;
pub use share_verifier::DnsShareVerifier;
pub use volume_store::{ChownGroupOwnership, DirectoryState, GroupOwnership, LocalVolumeStore};
