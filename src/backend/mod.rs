//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了样本存储的批处理缓存接口及其后端实现，包括Redis和进程内实现。

pub mod batch;
pub mod memory;
pub mod redis;
pub mod redis_provider;

pub use batch::{BatchCommand, BatchResults, BatchValue, CacheBatch, QueuedCommand};

use crate::error::Result;
use crate::keys::KeyKind;
use async_trait::async_trait;

/// 批处理缓存客户端
///
/// 级联引擎对缓存的全部要求：读取集合成员，以及一次往返执行一批命令。
#[async_trait]
pub trait BatchCache: Send + Sync {
    /// 读取 `kind` 类型集合 `name` 的成员，按字典序返回
    async fn read_set(&self, kind: KeyKind, name: &str) -> Result<Vec<String>>;

    /// 执行一批命令，每条命令对应一个结果
    async fn run_batch(&self, commands: Vec<QueuedCommand>) -> Result<Vec<BatchValue>>;
}

impl<'c> dyn BatchCache + 'c {
    /// 开始构建一个批处理
    pub fn batch(&self) -> CacheBatch<'_> {
        CacheBatch::new(self)
    }
}
