//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 测试和命令行共用的工具函数：日志设置、Redis配置与连通性检查、键前缀生成。

pub mod redaction;

use crate::config::{RedisConfig, RedisMode};
use secrecy::SecretString;
use std::sync::Once;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(EnvFilter::new("debug"))
            .try_init()
            .ok();
    });
}

/// 本地单机Redis配置
pub fn create_standalone_config(url: &str) -> RedisConfig {
    RedisConfig {
        mode: RedisMode::Standalone,
        connection_string: SecretString::new(url.into()),
        connection_timeout_ms: 2000,
        command_timeout_ms: 2000,
        ..Default::default()
    }
}

/// 检查Redis是否可用
///
/// 在超时时间内完成一次 PING 才视为可用
pub async fn is_redis_available(url: &str) -> bool {
    let client = match redis::Client::open(url) {
        Ok(client) => client,
        Err(_) => return false,
    };
    let probe = async {
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await
    };
    matches!(
        tokio::time::timeout(Duration::from_millis(500), probe).await,
        Ok(Ok(_))
    )
}

/// 生成唯一的键前缀，确保测试之间的隔离
pub fn generate_unique_prefix(base: &str) -> String {
    format!("{}_{}", base, uuid::Uuid::new_v4().simple())
}
