//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::NetworkId;
use crate::keyring::SigningSettings;

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub signing: SigningConfig,
    #[serde(default)]
    pub networks: NetworksConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

/// 签名超时配置（毫秒）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    pub credential_timeout_ms: u64,
    pub hardware_timeout_ms: u64,
}

/// 启用的网络
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworksConfig {
    pub enabled: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            credential_timeout_ms: std::env::var("CREDENTIAL_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30_000),
            hardware_timeout_ms: std::env::var("HARDWARE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120_000),
        }
    }
}

impl SigningConfig {
    pub fn settings(&self) -> SigningSettings {
        SigningSettings {
            credential_timeout: Duration::from_millis(self.credential_timeout_ms),
            hardware_timeout: Duration::from_millis(self.hardware_timeout_ms),
        }
    }
}

impl Default for NetworksConfig {
    fn default() -> Self {
        let enabled = std::env::var("ENABLED_NETWORKS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| {
                crate::chains::registry::DEFAULT_NETWORKS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });
        Self { enabled }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            logging: LoggingConfig::default(),
            signing: SigningConfig::default(),
            networks: NetworksConfig::default(),
        })
    }

    /// 从配置文件加载配置（缺省的段落使用环境变量默认值）
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        // 验证日志级别
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        // 验证日志格式
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        if self.signing.credential_timeout_ms == 0 || self.signing.hardware_timeout_ms == 0 {
            anyhow::bail!("signing timeouts must be greater than zero");
        }

        if self.networks.enabled.is_empty() {
            anyhow::bail!("at least one network must be enabled");
        }
        for network in &self.networks.enabled {
            network
                .parse::<NetworkId>()
                .with_context(|| format!("invalid network id in [networks]: {}", network))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_overrides_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"
format = "json"
enable_file_logging = false

[signing]
credential_timeout_ms = 500
hardware_timeout_ms = 1000

[networks]
enabled = ["evm--1", "sol--101"]
"#
        )
        .unwrap();

        let config = Config::from_env_and_file(Some(file.path())).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.networks.enabled, vec!["evm--1", "sol--101"]);
        assert_eq!(
            config.signing.settings().credential_timeout,
            Duration::from_millis(500)
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file_falls_back_to_env() {
        let config =
            Config::from_env_and_file(Some("/nonexistent/ironkeys.toml")).unwrap();
        assert!(!config.networks.enabled.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::from_env().unwrap();
        config.logging.level = "info".into();
        config.logging.format = "text".into();
        config.networks.enabled = vec!["evm--1".into()];
        config.signing.credential_timeout_ms = 1;
        config.signing.hardware_timeout_ms = 1;
        assert!(config.validate().is_ok());

        config.networks.enabled = vec!["doge--1".into()];
        assert!(config.validate().is_err());

        config.networks.enabled = vec!["evm--1".into()];
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }
}
