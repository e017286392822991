// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provisioner Configuration
//
// Identifies the backing file system and how it is mounted:
// - Provisioner name registered with the controller
// - File system id and region (used to derive the DNS name)
// - Optional explicit DNS name and mount override
//
// Loaded from YAML, then overridden by the container environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PROVISIONER_NAME_ENV: &str = "PROVISIONER_NAME";
pub const FILE_SYSTEM_ID_ENV: &str = "FILE_SYSTEM_ID";
pub const AWS_REGION_ENV: &str = "AWS_REGION";
pub const DNS_NAME_ENV: &str = "DNS_NAME";
pub const CONFIG_PATH_ENV: &str = "EFS_PROVISIONER_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionerConfig {
    /// Name the controller registers this provisioner under
    #[serde(default)]
    pub provisioner_name: String,

    /// Backing file system id (e.g. "fs-47a2c22e")
    #[serde(default)]
    pub file_system_id: String,

    #[serde(default)]
    pub aws_region: String,

    /// Explicit DNS name; derived from id and region when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,

    /// Mount table consulted to find the share's mountpoint
    #[serde(default = "default_mount_table")]
    pub mount_table: PathBuf,

    /// Skip mount discovery and use this mount instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount: Option<MountOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountOverride {
    pub mountpoint: PathBuf,
    pub source: String,
}

fn default_mount_table() -> PathBuf {
    PathBuf::from("/proc/mounts")
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            provisioner_name: String::new(),
            file_system_id: String::new(),
            aws_region: String::new(),
            dns_name: None,
            mount_table: default_mount_table(),
            mount: None,
        }
    }
}

impl ProvisionerConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. EFS_PROVISIONER_CONFIG_PATH environment variable
    /// 2. ./efs-provisioner.yaml (working directory)
    /// 3. ~/.efs-provisioner/config.yaml (user home)
    /// 4. /etc/efs-provisioner/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./efs-provisioner.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".efs-provisioner").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/efs-provisioner/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path (fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using environment only.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(val) = non_empty(PROVISIONER_NAME_ENV) {
            tracing::debug!("Environment override: {}={}", PROVISIONER_NAME_ENV, val);
            self.provisioner_name = val;
        }
        if let Some(val) = non_empty(FILE_SYSTEM_ID_ENV) {
            tracing::debug!("Environment override: {}={}", FILE_SYSTEM_ID_ENV, val);
            self.file_system_id = val;
        }
        if let Some(val) = non_empty(AWS_REGION_ENV) {
            tracing::debug!("Environment override: {}={}", AWS_REGION_ENV, val);
            self.aws_region = val;
        }
        if let Some(val) = non_empty(DNS_NAME_ENV) {
            tracing::debug!("Environment override: {}={}", DNS_NAME_ENV, val);
            self.dns_name = Some(val);
        }
    }

    /// DNS name clients mount the share by
    pub fn server_name(&self) -> String {
        match &self.dns_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("{}.efs.{}.amazonaws.com", self.file_system_id, self.aws_region),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.provisioner_name.is_empty() {
            anyhow::bail!(
                "provisioner_name is not set! Set it in the config file or via {}",
                PROVISIONER_NAME_ENV
            );
        }

        if self.file_system_id.is_empty() {
            anyhow::bail!(
                "file_system_id is not set! Set it in the config file or via {}",
                FILE_SYSTEM_ID_ENV
            );
        }

        if self.aws_region.is_empty() {
            anyhow::bail!(
                "aws_region is not set! Set it in the config file or via {}",
                AWS_REGION_ENV
            );
        }

        if let Some(mount) = &self.mount {
            if !mount.mountpoint.is_absolute() {
                anyhow::bail!(
                    "mount.mountpoint must be an absolute path, got {}",
                    mount.mountpoint.display()
                );
            }
            if mount.source.is_empty() {
                anyhow::bail!("mount.source cannot be empty");
            }
        }

        Ok(())
    }
}
