//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了配置结构和解析逻辑。

use crate::error::{Result, SubjectError};
use crate::keys::{KeySpace, DEFAULT_PREFIX};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sample_store: SampleStoreConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// Redis模式枚举
///
/// 定义支持的Redis部署模式
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    /// 单机模式
    #[default]
    Standalone,
    /// 哨兵模式
    Sentinel,
    /// 集群模式
    Cluster,
}

/// Redis样本存储配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis模式
    pub mode: RedisMode,
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
    /// Redis 密码（可选）
    pub password: Option<SecretString>,
    /// 是否启用 TLS
    pub enable_tls: bool,
    /// 哨兵配置
    pub sentinel: Option<SentinelConfig>,
    /// 集群配置
    pub cluster: Option<ClusterConfig>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            mode: RedisMode::Standalone,
            connection_string: SecretString::new("redis://localhost:6379".into()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
            password: None,
            enable_tls: false,
            sentinel: None,
            cluster: None,
        }
    }
}

/// 哨兵配置
#[derive(Deserialize, Clone, Debug)]
pub struct SentinelConfig {
    /// 主节点名称
    pub master_name: String,
    /// 哨兵节点列表
    pub nodes: Vec<String>,
}

/// 集群配置
#[derive(Deserialize, Clone, Debug)]
pub struct ClusterConfig {
    /// 初始节点列表
    pub nodes: Vec<String>,
}

/// 关系存储配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 数据库连接串，例如 `postgres://...` 或 `sqlite::memory:`
    pub url: SecretString,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    /// 是否输出 sqlx 语句日志
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: SecretString::new("sqlite::memory:".into()),
            max_connections: 1,
            connect_timeout_ms: 10_000,
            sqlx_logging: false,
        }
    }
}

/// 样本存储键配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SampleStoreConfig {
    pub key_prefix: String,
}

impl Default for SampleStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl SampleStoreConfig {
    pub fn key_space(&self) -> KeySpace {
        KeySpace::new(self.key_prefix.clone())
    }
}

/// 实时通知配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RealtimeConfig {
    /// 关闭时级联不发布任何通知
    pub enabled: bool,
    /// 发布频道
    pub channel: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: "sample:events".to_string(),
        }
    }
}

impl Config {
    /// 从 TOML 文本解析配置
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| SubjectError::ConfigError(e.to_string()))?;
        config.validate().map_err(SubjectError::ConfigError)?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保所有值在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = self.config_version {
            if version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        let redis = &self.redis;
        if !(100..=30000).contains(&redis.connection_timeout_ms) {
            return Err("redis.connection_timeout_ms must be between 100 and 30000 ms".to_string());
        }
        if !(100..=60000).contains(&redis.command_timeout_ms) {
            return Err("redis.command_timeout_ms must be between 100 and 60000 ms".to_string());
        }
        match redis.mode {
            RedisMode::Sentinel if redis.sentinel.is_none() => {
                return Err("redis.mode = sentinel requires [redis.sentinel]".to_string());
            }
            RedisMode::Cluster
                if redis.cluster.as_ref().map_or(true, |c| c.nodes.is_empty()) =>
            {
                return Err("redis.mode = cluster requires at least one cluster node".to_string());
            }
            _ => {}
        }

        if self.database.max_connections == 0 {
            return Err("database.max_connections cannot be zero".to_string());
        }

        let prefix = &self.sample_store.key_prefix;
        if prefix.is_empty() || prefix.contains(':') || prefix.len() > 32 {
            return Err(
                "sample_store.key_prefix must be 1-32 characters and must not contain ':'"
                    .to_string(),
            );
        }

        if self.realtime.enabled && self.realtime.channel.is_empty() {
            return Err("realtime.channel cannot be empty when realtime is enabled".to_string());
        }

        Ok(())
    }
}
