// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the EFS provisioner CLI

pub mod config;
pub mod inspect;
pub mod reclaim;
pub mod resolve;

pub use self::config::ConfigCommand;
pub use self::reclaim::ReclaimCommand;
pub use self::resolve::ResolveCommand;
