// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! EFS Provisioner Core
//!
//! Carves per-claim directories out of a single mounted NFS share and
//! describes them as volumes.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, provisioning workflow and filesystem adapters

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
