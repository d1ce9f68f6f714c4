//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 进程内批处理缓存，基于 DashMap 实现，用于测试和演练模式。

use super::{BatchCache, BatchCommand, BatchValue, QueuedCommand};
use crate::error::Result;
use crate::keys::{KeyKind, KeySpace};
use crate::subject::CacheRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// 进程内批处理缓存
///
/// 与Redis后端使用同样的键布局，批处理按顺序逐条执行，同样不保证原子性。
#[derive(Debug, Default)]
pub struct MemoryBatchCache {
    keys: KeySpace,
    records: DashMap<String, CacheRecord>,
    sets: DashMap<String, BTreeSet<String>>,
}

impl MemoryBatchCache {
    pub fn new(keys: KeySpace) -> Self {
        Self {
            keys,
            records: DashMap::new(),
            sets: DashMap::new(),
        }
    }

    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    /// 检查完整键是否存在（记录或非空集合）
    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key) || self.sets.get(key).is_some_and(|s| !s.is_empty())
    }

    /// 按完整键读取集合成员
    pub fn members(&self, key: &str) -> Vec<String> {
        self.sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 按完整键读取记录
    pub fn record(&self, key: &str) -> Option<CacheRecord> {
        self.records.get(key).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len() + self.sets.iter().filter(|s| !s.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_member(&self, key: &str, member: &str) -> i64 {
        let removed = match self.sets.get_mut(key) {
            Some(mut set) => set.remove(member),
            None => false,
        };
        // 空集合等同于不存在
        self.sets.remove_if(key, |_, set| set.is_empty());
        i64::from(removed)
    }

    fn add_member(&self, key: &str, member: &str) -> i64 {
        i64::from(
            self.sets
                .entry(key.to_string())
                .or_default()
                .insert(member.to_string()),
        )
    }

    fn apply(&self, command: BatchCommand) -> BatchValue {
        match command {
            BatchCommand::RemoveMember { kind, name, member } => {
                BatchValue::Count(self.remove_member(&self.keys.key(kind, &name), &member))
            }
            BatchCommand::AddMember { kind, name, member } => {
                BatchValue::Count(self.add_member(&self.keys.key(kind, &name), &member))
            }
            BatchCommand::DeleteKey { kind, name } => {
                let key = self.keys.key(kind, &name);
                if let Some(index) = self.keys.master_index(kind) {
                    self.remove_member(&index, &key);
                }
                let removed = self.records.remove(&key).is_some() || self.sets.remove(&key).is_some();
                BatchValue::Count(i64::from(removed))
            }
            BatchCommand::ReadRecord { kind, name } => {
                BatchValue::Record(self.record(&self.keys.key(kind, &name)))
            }
            BatchCommand::WriteRecord { kind, name, record } => {
                let key = self.keys.key(kind, &name);
                if let Some(index) = self.keys.master_index(kind) {
                    self.add_member(&index, &key);
                }
                self.records.entry(key).or_default().extend(record);
                BatchValue::Ack
            }
        }
    }
}

#[async_trait]
impl BatchCache for MemoryBatchCache {
    #[instrument(skip(self), level = "debug")]
    async fn read_set(&self, kind: KeyKind, name: &str) -> Result<Vec<String>> {
        Ok(self.members(&self.keys.key(kind, name)))
    }

    #[instrument(skip(self, commands), level = "debug", fields(command_count = commands.len()))]
    async fn run_batch(&self, commands: Vec<QueuedCommand>) -> Result<Vec<BatchValue>> {
        debug!("Memory batch with {} commands", commands.len());
        Ok(commands
            .into_iter()
            .map(|queued| self.apply(queued.command))
            .collect())
    }
}
