//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的批处理缓存后端，批处理映射为一次流水线往返。

use super::{BatchCache, BatchCommand, BatchValue, QueuedCommand};
use crate::backend::redis_provider::{DefaultRedisProvider, RedisProvider};
use crate::config::{RedisConfig, RedisMode};
use crate::error::{Result, SubjectError};
use crate::keys::{KeyKind, KeySpace};
use crate::subject::CacheRecord;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, instrument};

#[derive(Clone)]
enum Connection {
    Standalone {
        client: Client,
        manager: ConnectionManager,
    },
    Cluster {
        client: redis::cluster::ClusterClient,
    },
}

/// Redis批处理缓存
///
/// 流水线不使用 MULTI/EXEC，进程在批处理中途崩溃时可能只完成部分命令。
#[derive(Clone)]
pub struct RedisBatchCache {
    connection: Connection,
    keys: KeySpace,
    command_timeout_ms: u64,
}

impl std::fmt::Debug for RedisBatchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.connection {
            Connection::Standalone { .. } => write!(f, "RedisBatchCache::Standalone"),
            Connection::Cluster { .. } => write!(f, "RedisBatchCache::Cluster"),
        }
    }
}

impl RedisBatchCache {
    /// 根据配置创建Redis批处理缓存
    #[instrument(skip(config, keys), level = "info", name = "init_redis_batch_cache")]
    pub async fn new(config: &RedisConfig, keys: KeySpace) -> Result<Self> {
        Self::new_with_provider(config, keys, Arc::new(DefaultRedisProvider)).await
    }

    /// 使用指定的Redis提供者创建
    #[instrument(skip(config, keys, provider), level = "info", fields(mode = ?config.mode))]
    pub async fn new_with_provider(
        config: &RedisConfig,
        keys: KeySpace,
        provider: Arc<dyn RedisProvider>,
    ) -> Result<Self> {
        debug!("Initializing RedisBatchCache with mode: {:?}", config.mode);
        let connection = match config.mode {
            RedisMode::Standalone => {
                let (client, manager) = provider.get_standalone_client(config).await?;
                Connection::Standalone { client, manager }
            }
            RedisMode::Sentinel => {
                let (client, manager) = provider.get_sentinel_client(config).await?;
                Connection::Standalone { client, manager }
            }
            RedisMode::Cluster => Connection::Cluster {
                client: provider.get_cluster_client(config).await?,
            },
        };
        Ok(Self {
            connection,
            keys,
            command_timeout_ms: config.command_timeout_ms,
        })
    }

    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    pub fn command_timeout_ms(&self) -> u64 {
        self.command_timeout_ms
    }

    /// 获取连接管理器，集群模式不支持
    pub fn connection_manager(&self) -> Result<ConnectionManager> {
        match &self.connection {
            Connection::Standalone { manager, .. } => Ok(manager.clone()),
            Connection::Cluster { .. } => Err(SubjectError::CacheError(
                "connection_manager is not supported in Cluster mode".to_string(),
            )),
        }
    }

    /// 获取原始Redis客户端，集群模式不支持
    pub fn raw_client(&self) -> Result<Client> {
        match &self.connection {
            Connection::Standalone { client, .. } => Ok(client.clone()),
            Connection::Cluster { .. } => Err(SubjectError::CacheError(
                "raw_client is not supported in Cluster mode".to_string(),
            )),
        }
    }

    /// 检查连接是否正常
    #[instrument(skip(self), level = "debug")]
    pub async fn ping(&self) -> Result<()> {
        let _: String = match &self.connection {
            Connection::Standalone { manager, .. } => {
                redis::cmd("PING").query_async(&mut manager.clone()).await?
            }
            Connection::Cluster { client } => {
                redis::cmd("PING")
                    .query_async(&mut client.get_async_connection().await?)
                    .await?
            }
        };
        Ok(())
    }

    fn build_pipeline(&self, commands: &[QueuedCommand]) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        for queued in commands {
            match &queued.command {
                BatchCommand::RemoveMember { kind, name, member } => {
                    pipe.srem(self.keys.key(*kind, name), member);
                }
                BatchCommand::AddMember { kind, name, member } => {
                    pipe.sadd(self.keys.key(*kind, name), member);
                }
                BatchCommand::DeleteKey { kind, name } => {
                    let key = self.keys.key(*kind, name);
                    if let Some(index) = self.keys.master_index(*kind) {
                        pipe.srem(index, &key).ignore();
                    }
                    pipe.del(&key);
                }
                BatchCommand::ReadRecord { kind, name } => {
                    pipe.hgetall(self.keys.key(*kind, name));
                }
                BatchCommand::WriteRecord { kind, name, record } => {
                    let key = self.keys.key(*kind, name);
                    if let Some(index) = self.keys.master_index(*kind) {
                        pipe.sadd(index, &key).ignore();
                    }
                    if record.is_empty() {
                        // HSET 不接受空字段列表，占位以保持结果一一对应
                        pipe.exists(&key);
                    } else {
                        let fields: Vec<(&String, &String)> = record.iter().collect();
                        pipe.hset_multiple(&key, &fields);
                    }
                }
            }
        }
        pipe
    }

    fn to_batch_value(command: &BatchCommand, value: &redis::Value) -> Result<BatchValue> {
        match command {
            BatchCommand::ReadRecord { .. } => {
                let record: CacheRecord = redis::from_redis_value(value)?;
                Ok(BatchValue::Record(if record.is_empty() {
                    None
                } else {
                    Some(record)
                }))
            }
            BatchCommand::WriteRecord { .. } => Ok(BatchValue::Ack),
            _ => Ok(BatchValue::Count(redis::from_redis_value(value)?)),
        }
    }

    async fn query_pipeline(&self, pipe: &redis::Pipeline) -> Result<Vec<redis::Value>> {
        let query = async {
            match &self.connection {
                Connection::Standalone { manager, .. } => {
                    pipe.query_async::<Vec<redis::Value>>(&mut manager.clone())
                        .await
                }
                Connection::Cluster { client } => match client.get_async_connection().await {
                    Ok(mut conn) => pipe.query_async::<Vec<redis::Value>>(&mut conn).await,
                    Err(e) => Err(e),
                },
            }
        };
        timeout(Duration::from_millis(self.command_timeout_ms), query)
            .await
            .map_err(|_| {
                SubjectError::CacheError(format!(
                    "Pipeline timed out after {}ms",
                    self.command_timeout_ms
                ))
            })?
            .map_err(SubjectError::from)
    }
}

#[async_trait]
impl BatchCache for RedisBatchCache {
    #[instrument(skip(self), level = "debug")]
    async fn read_set(&self, kind: KeyKind, name: &str) -> Result<Vec<String>> {
        let key = self.keys.key(kind, name);
        let mut members: Vec<String> = match &self.connection {
            Connection::Standalone { manager, .. } => manager.clone().smembers(&key).await?,
            Connection::Cluster { client } => {
                client.get_async_connection().await?.smembers(&key).await?
            }
        };
        members.sort();
        Ok(members)
    }

    #[instrument(skip(self, commands), level = "debug", fields(command_count = commands.len()))]
    async fn run_batch(&self, commands: Vec<QueuedCommand>) -> Result<Vec<BatchValue>> {
        debug!("Pipeline batch with {} commands", commands.len());
        if commands.is_empty() {
            return Ok(Vec::new());
        }
        let pipe = self.build_pipeline(&commands);
        let values = self.query_pipeline(&pipe).await?;
        if values.len() != commands.len() {
            return Err(SubjectError::CacheError(format!(
                "pipeline returned {} replies for {} commands",
                values.len(),
                commands.len()
            )));
        }
        commands
            .iter()
            .zip(values.iter())
            .map(|(queued, value)| Self::to_batch_value(&queued.command, value))
            .collect()
    }
}
