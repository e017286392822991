// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod bootstrap;
pub mod gid_lease;
pub mod provisioner;

pub use bootstrap::{build_provisioner, resolve_share};
pub use gid_lease::GidLease;
pub use provisioner::EfsProvisioner;
