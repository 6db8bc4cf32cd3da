// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration Types
//
// Defines the configuration schema for a NeoCDT service instance:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Storage backend selection (in-memory or PostgreSQL)
// - Lifecycle policy (minimum principal)
// - Logging settings consumed by the CLI

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::deposit::{default_minimum_principal, LifecyclePolicy};
use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "neocdt/v1";
pub const KIND: &str = "ServiceConfig";
pub const CONFIG_PATH_ENV: &str = "NEOCDT_CONFIG_PATH";
pub const DATABASE_URL_ENV: &str = "NEOCDT_DATABASE_URL";
pub const MINIMUM_PRINCIPAL_ENV: &str = "NEOCDT_MINIMUM_PRINCIPAL";

/// Top-level Kubernetes-style service configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// API version (must be "neocdt/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ServiceConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: ServiceConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable instance name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfigSpec {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_kind")]
    pub backend: StorageKind,

    /// PostgreSQL connection string (required when backend is postgres)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_kind(),
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Smallest principal accepted for a deposit request
    #[serde(default = "default_minimum_principal")]
    pub minimum_principal: Decimal,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            minimum_principal: default_minimum_principal(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "neocdt-local".to_string(),
                version: None,
                labels: None,
            },
            spec: ServiceConfigSpec::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
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
    /// 1. NEOCDT_CONFIG_PATH environment variable
    /// 2. ./neocdt-config.yaml (working directory)
    /// 3. ~/.neocdt/config.yaml (user home)
    /// 4. /etc/neocdt/config.yaml (system, Unix) or C:\ProgramData\NeoCDT\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./neocdt-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".neocdt").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/neocdt/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\NeoCDT\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails hard if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                tracing::info!(
                    "Environment override: {} set, using postgres backend",
                    DATABASE_URL_ENV
                );
                self.spec.storage.backend = StorageKind::Postgres;
                self.spec.storage.database_url = Some(url);
            }
        }

        if let Ok(val) = std::env::var(MINIMUM_PRINCIPAL_ENV) {
            match val.trim().parse::<Decimal>() {
                Ok(min) => {
                    tracing::info!("Environment override: {}={}", MINIMUM_PRINCIPAL_ENV, min);
                    self.spec.policy.minimum_principal = min;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for {}: '{}'. Expected a decimal amount. Ignoring.",
                        MINIMUM_PRINCIPAL_ENV,
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.storage.backend == StorageKind::Postgres {
            match &self.spec.storage.database_url {
                Some(url) if !url.trim().is_empty() => {}
                _ => anyhow::bail!(
                    "spec.storage.database_url is required for the postgres backend"
                ),
            }
            if self.spec.storage.max_connections == 0 {
                anyhow::bail!("spec.storage.max_connections must be at least 1");
            }
        }

        if self.spec.policy.minimum_principal <= Decimal::ZERO {
            anyhow::bail!("spec.policy.minimum_principal must be greater than zero");
        }

        Ok(())
    }

    pub fn storage_backend(&self) -> StorageBackend {
        match (self.spec.storage.backend, &self.spec.storage.database_url) {
            (StorageKind::Postgres, Some(url)) => StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: url.clone(),
                max_connections: self.spec.storage.max_connections,
            }),
            _ => StorageBackend::InMemory,
        }
    }

    pub fn lifecycle_policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            minimum_principal: self.spec.policy.minimum_principal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let config = ServiceConfig::default();
        assert_eq!(config.api_version, "neocdt/v1");
        assert_eq!(config.kind, "ServiceConfig");
        assert_eq!(config.spec.storage.backend, StorageKind::InMemory);
        assert_eq!(config.spec.policy.minimum_principal, Decimal::new(100_000, 0));
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_backend(), StorageBackend::InMemory);
    }

    #[test]
    fn test_yaml_with_partial_spec_uses_defaults() {
        let yaml = r#"
apiVersion: neocdt/v1
kind: ServiceConfig
metadata:
  name: branch-bogota
spec:
  storage:
    backend: postgres
    database_url: postgres://neocdt@localhost/neocdt
  policy:
    minimum_principal: "250000"
"#;
        let config = ServiceConfig::from_yaml_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.spec.storage.max_connections, 5);
        assert_eq!(config.spec.logging.format, LogFormat::Compact);
        assert_eq!(config.lifecycle_policy().minimum_principal, Decimal::new(250_000, 0));
        assert_eq!(
            config.storage_backend(),
            StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: "postgres://neocdt@localhost/neocdt".to_string(),
                max_connections: 5,
            })
        );
    }

    #[test]
    fn test_validation() {
        let mut config = ServiceConfig::default();

        config.api_version = "wrong/v1".to_string();
        assert!(config.validate().is_err());
        config.api_version = API_VERSION.to_string();

        config.kind = "NodeConfig".to_string();
        assert!(config.validate().is_err());
        config.kind = KIND.to_string();

        config.spec.storage.backend = StorageKind::Postgres;
        assert!(config.validate().is_err());
        config.spec.storage.database_url = Some("postgres://localhost/neocdt".to_string());
        assert!(config.validate().is_ok());

        config.spec.policy.minimum_principal = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neocdt-config.yaml");

        let mut config = ServiceConfig::default();
        config.metadata.name = "branch-medellin".to_string();
        config.spec.logging.format = LogFormat::Json;
        config.to_yaml_file(&path).unwrap();

        let loaded = ServiceConfig::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.metadata.name, "branch-medellin");
        assert_eq!(loaded.spec.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ServiceConfig::load_or_default(Some(dir.path().join("absent.yaml"))).is_err());
    }
}

fn default_storage_kind() -> StorageKind {
    StorageKind::InMemory
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
