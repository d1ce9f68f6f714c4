//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 流水线批处理构建器。
//!
//! 批处理先在内存中排队命令，再由 [`BatchCache::run_batch`] 一次往返执行。
//! 在 `read_then_collect` / `then_for_each` 中排队的命令会带上分组标签，
//! 执行后其结果按排队顺序收集到同名分组中。

use super::BatchCache;
use crate::error::{Result, SubjectError};
use crate::keys::KeyKind;
use crate::subject::CacheRecord;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// 批处理中的单条命令
#[derive(Debug, Clone, PartialEq)]
pub enum BatchCommand {
    /// 从 `kind` 类型的集合 `name` 中移除成员
    RemoveMember {
        kind: KeyKind,
        name: String,
        member: String,
    },
    /// 向 `kind` 类型的集合 `name` 中添加成员
    AddMember {
        kind: KeyKind,
        name: String,
        member: String,
    },
    /// 删除键，记录类型同时移出主索引
    DeleteKey { kind: KeyKind, name: String },
    /// 读取完整的哈希记录
    ReadRecord { kind: KeyKind, name: String },
    /// 写入哈希记录，记录类型同时加入主索引
    WriteRecord {
        kind: KeyKind,
        name: String,
        record: CacheRecord,
    },
}

/// 排队中的命令及其分组标签
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCommand {
    pub command: BatchCommand,
    pub group: Option<String>,
}

/// 单条命令的执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum BatchValue {
    /// 受影响的键或成员数量
    Count(i64),
    /// 读取到的记录，不存在时为 None
    Record(Option<CacheRecord>),
    /// 写入确认
    Ack,
}

impl BatchValue {
    pub fn as_count(&self) -> i64 {
        match self {
            BatchValue::Count(n) => *n,
            _ => 0,
        }
    }
}

/// 按分组标签收集的批处理结果
#[derive(Debug, Default, Clone)]
pub struct BatchResults {
    groups: HashMap<String, Vec<BatchValue>>,
}

impl BatchResults {
    /// 获取分组中的结果，未知标签返回空切片
    pub fn group(&self, label: &str) -> &[BatchValue] {
        self.groups.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 取出分组中的记录，非记录结果视为 None
    pub fn take_records(&mut self, label: &str) -> Vec<Option<CacheRecord>> {
        self.groups
            .remove(label)
            .unwrap_or_default()
            .into_iter()
            .map(|value| match value {
                BatchValue::Record(record) => record,
                _ => None,
            })
            .collect()
    }

    /// 分组中计数结果之和
    pub fn total(&self, label: &str) -> i64 {
        self.group(label).iter().map(BatchValue::as_count).sum()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

/// 批处理构建器
///
/// 以值传递的方式链式构建，最后调用 [`CacheBatch::exec`]。
pub struct CacheBatch<'a> {
    cache: &'a dyn BatchCache,
    commands: Vec<QueuedCommand>,
    labels: Vec<String>,
    group: Option<String>,
}

impl<'a> CacheBatch<'a> {
    pub fn new(cache: &'a dyn BatchCache) -> Self {
        Self {
            cache,
            commands: Vec::new(),
            labels: Vec::new(),
            group: None,
        }
    }

    fn push(mut self, command: BatchCommand) -> Self {
        self.commands.push(QueuedCommand {
            command,
            group: self.group.clone(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[QueuedCommand] {
        &self.commands
    }

    /// 从索引 `from_name` 中移除 `member`
    pub fn delete_member(self, kind: KeyKind, member: &str, from_name: &str) -> Self {
        self.push(BatchCommand::RemoveMember {
            kind,
            name: from_name.to_string(),
            member: member.to_string(),
        })
    }

    /// 向索引 `to_name` 中添加 `member`
    pub fn add_member(self, kind: KeyKind, member: &str, to_name: &str) -> Self {
        self.push(BatchCommand::AddMember {
            kind,
            name: to_name.to_string(),
            member: member.to_string(),
        })
    }

    pub fn delete_key(self, kind: KeyKind, name: &str) -> Self {
        self.push(BatchCommand::DeleteKey {
            kind,
            name: name.to_string(),
        })
    }

    pub fn read_record(self, kind: KeyKind, name: &str) -> Self {
        self.push(BatchCommand::ReadRecord {
            kind,
            name: name.to_string(),
        })
    }

    pub fn write_record(self, kind: KeyKind, name: &str, record: CacheRecord) -> Self {
        self.push(BatchCommand::WriteRecord {
            kind,
            name: name.to_string(),
            record,
        })
    }

    /// 对每个名称执行 `f`，并把这些命令的结果收集到 `label` 分组
    pub fn read_then_collect<F>(self, names: &[String], label: &str, f: F) -> Self
    where
        F: Fn(Self, &str) -> Self,
    {
        self.grouped(names, label, f)
    }

    /// 对每个名称执行 `f`，结果收集到 `label` 分组（通常是删除计数）
    pub fn then_for_each<F>(self, names: &[String], label: &str, f: F) -> Self
    where
        F: Fn(Self, &str) -> Self,
    {
        self.grouped(names, label, f)
    }

    fn grouped<F>(mut self, names: &[String], label: &str, f: F) -> Self
    where
        F: Fn(Self, &str) -> Self,
    {
        if !self.labels.iter().any(|l| l == label) {
            self.labels.push(label.to_string());
        }
        let previous = self.group.replace(label.to_string());
        let mut batch = names.iter().fold(self, |batch, name| f(batch, name.as_str()));
        batch.group = previous;
        batch
    }

    /// 一次往返执行所有排队命令
    #[instrument(skip(self), level = "debug", fields(command_count = self.commands.len()))]
    pub async fn exec(self) -> Result<BatchResults> {
        let CacheBatch {
            cache,
            commands,
            labels,
            ..
        } = self;

        let mut groups: HashMap<String, Vec<BatchValue>> = labels
            .into_iter()
            .map(|label| (label, Vec::new()))
            .collect();

        if commands.is_empty() {
            return Ok(BatchResults { groups });
        }

        let tags: Vec<Option<String>> = commands.iter().map(|c| c.group.clone()).collect();
        let values = cache.run_batch(commands).await?;
        if values.len() != tags.len() {
            return Err(SubjectError::CacheError(format!(
                "batch returned {} results for {} commands",
                values.len(),
                tags.len()
            )));
        }

        for (group, value) in tags.into_iter().zip(values) {
            if let Some(label) = group {
                groups.entry(label).or_default().push(value);
            }
        }
        debug!("Batch executed, groups={}", groups.len());
        Ok(BatchResults { groups })
    }
}
