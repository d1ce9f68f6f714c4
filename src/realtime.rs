//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了样本变更通知的发布接口和基于Redis频道的实现。

use crate::error::{Result, SubjectError};
use crate::subject::CacheRecord;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// 样本事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEvent {
    Add,
    Update,
    Delete,
}

impl SampleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleEvent::Add => "sample.add",
            SampleEvent::Update => "sample.update",
            SampleEvent::Delete => "sample.delete",
        }
    }
}

impl std::fmt::Display for SampleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通知发布者
///
/// 尽力投递；返回即表示发布已完成（或失败），调用方必须等待。
#[async_trait]
pub trait SamplePublisher: Send + Sync {
    async fn publish(&self, record: &CacheRecord, event: SampleEvent) -> Result<()>;
}

/// 消息体：`{"<event>": {record}}`
pub fn envelope(record: &CacheRecord, event: SampleEvent) -> Result<String> {
    let mut body: BTreeMap<&str, &CacheRecord> = BTreeMap::new();
    body.insert(event.as_str(), record);
    serde_json::to_string(&body).map_err(SubjectError::from)
}

/// 基于Redis PUBLISH 的通知发布者
pub struct RedisSamplePublisher {
    /// 连接管理器
    manager: redis::aio::ConnectionManager,
    /// 频道名称
    channel: String,
}

impl RedisSamplePublisher {
    pub fn new(manager: redis::aio::ConnectionManager, channel: String) -> Self {
        Self { manager, channel }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl SamplePublisher for RedisSamplePublisher {
    #[instrument(skip(self, record), level = "debug", fields(channel = %self.channel))]
    async fn publish(&self, record: &CacheRecord, event: SampleEvent) -> Result<()> {
        let payload = envelope(record, event)?;
        let mut conn = self.manager.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| SubjectError::PublishError(e.to_string()))?;
        debug!("Published {} to {} receivers", event, receivers);
        Ok(())
    }
}

/// 丢弃所有通知的发布者，用于关闭实时通知的部署
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl SamplePublisher for NoopPublisher {
    async fn publish(&self, _record: &CacheRecord, _event: SampleEvent) -> Result<()> {
        Ok(())
    }
}
