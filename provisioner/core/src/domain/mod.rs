// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod gid;
pub mod metadata;
pub mod path_translator;
pub mod provisioner;
pub mod provisioner_config;
pub mod share;
pub mod volume;
