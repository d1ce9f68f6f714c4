//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了测试的通用工具函数和设置。

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subjectcache::backend::memory::MemoryBatchCache;
use subjectcache::backend::BatchCache;
use subjectcache::database::SubjectStore;
use subjectcache::error::{Result, SubjectError};
use subjectcache::keys::{sample_name, KeyKind};
use subjectcache::realtime::{SampleEvent, SamplePublisher};
use subjectcache::subject::{CacheRecord, Subject};
use tokio::sync::Barrier;
use uuid::Uuid;

pub use subjectcache::utils::{generate_unique_prefix, is_redis_available, setup_logging};

/// 进程内主题存储
///
/// 默认情况下计数增减在锁内完成；设置递减闸门后，递减会先读取计数，
/// 等所有参与者都读完再写回，用来复现并发递减丢失更新。
#[derive(Default)]
pub struct InMemorySubjectStore {
    subjects: Mutex<BTreeMap<Uuid, Subject>>,
    decrement_gate: Option<Arc<Barrier>>,
}

impl InMemorySubjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让 `participants` 个递减先全部读取再各自写回
    pub fn with_racy_decrements(participants: usize) -> Self {
        Self {
            subjects: Mutex::new(BTreeMap::new()),
            decrement_gate: Some(Arc::new(Barrier::new(participants))),
        }
    }

    /// 直接写入主题，不校验、不调整计数
    pub fn seed(&self, subject: &Subject) {
        self.subjects
            .lock()
            .unwrap()
            .insert(subject.id, subject.clone());
    }

    pub fn get(&self, id: Uuid) -> Option<Subject> {
        self.subjects.lock().unwrap().get(&id).cloned()
    }

    pub fn child_count(&self, id: Uuid) -> i32 {
        self.get(id).map(|s| s.child_count).unwrap_or_default()
    }

    /// 以 parent_id 统计的真实子节点数量
    pub fn actual_children(&self, id: Uuid) -> i32 {
        self.subjects
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.parent_id == Some(id))
            .count() as i32
    }

    fn set_child_count(&self, id: Uuid, count: i32) {
        if let Some(subject) = self.subjects.lock().unwrap().get_mut(&id) {
            subject.child_count = count.max(0);
        }
    }
}

#[async_trait]
impl SubjectStore for InMemorySubjectStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Subject>> {
        Ok(self.get(id))
    }

    async fn find_by_absolute_path(&self, absolute_path: &str) -> Result<Option<Subject>> {
        let wanted = absolute_path.to_lowercase();
        Ok(self
            .subjects
            .lock()
            .unwrap()
            .values()
            .find(|s| s.absolute_path.to_lowercase() == wanted)
            .cloned())
    }

    async fn decrement_child_count(&self, id: Uuid) -> Result<()> {
        match &self.decrement_gate {
            Some(gate) => {
                let observed = self.child_count(id);
                gate.wait().await;
                self.set_child_count(id, observed - 1);
            }
            None => {
                let current = self.child_count(id);
                self.set_child_count(id, current - 1);
            }
        }
        Ok(())
    }

    async fn increment_child_count(&self, id: Uuid) -> Result<()> {
        let current = self.child_count(id);
        self.set_child_count(id, current + 1);
        Ok(())
    }

    async fn insert(&self, subject: &Subject) -> Result<()> {
        if self
            .find_by_absolute_path(&subject.absolute_path)
            .await?
            .is_some()
        {
            return Err(SubjectError::SubjectAlreadyExistsUnderParent(format!(
                "{} already exists.",
                subject.absolute_path
            )));
        }
        self.seed(subject);
        Ok(())
    }

    async fn update(&self, subject: &Subject) -> Result<()> {
        let mut subjects = self.subjects.lock().unwrap();
        match subjects.get_mut(&subject.id) {
            Some(existing) => {
                // 计数由增减操作维护，更新时保留存储中的值
                let child_count = existing.child_count;
                *existing = Subject {
                    child_count,
                    ..subject.clone()
                };
                Ok(())
            }
            None => Err(SubjectError::SubjectNotFound(subject.id.to_string())),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.subjects.lock().unwrap().remove(&id).is_some())
    }
}

/// 记录所有通知的发布者
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(CacheRecord, SampleEvent)>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<(CacheRecord, SampleEvent)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl SamplePublisher for RecordingPublisher {
    async fn publish(&self, record: &CacheRecord, event: SampleEvent) -> Result<()> {
        self.published.lock().unwrap().push((record.clone(), event));
        Ok(())
    }
}

/// 总是失败的发布者
pub struct FailingPublisher;

#[async_trait]
impl SamplePublisher for FailingPublisher {
    async fn publish(&self, _record: &CacheRecord, _event: SampleEvent) -> Result<()> {
        Err(SubjectError::PublishError("channel unavailable".to_string()))
    }
}

/// 构造样本记录
pub fn sample_record(subject: &Subject, aspect: &str, value: &str) -> CacheRecord {
    let mut record = CacheRecord::new();
    record.insert(
        "name".to_string(),
        format!("{}|{}", subject.absolute_path, aspect),
    );
    record.insert("value".to_string(), value.to_string());
    record.insert("status".to_string(), "OK".to_string());
    record.insert(
        "updatedAt".to_string(),
        "2020-01-01T00:00:00.000Z".to_string(),
    );
    record
}

/// 写入主题记录、标签索引成员
pub async fn seed_subject(cache: &dyn BatchCache, subject: &Subject) -> Result<()> {
    let member = subject.absolute_path.to_lowercase();
    subject
        .tags
        .iter()
        .fold(cache.batch(), |batch, tag| {
            batch.add_member(KeyKind::SubjectTagMap, &member, tag)
        })
        .write_record(
            KeyKind::Subject,
            &subject.absolute_path,
            subject.to_cache_record()?,
        )
        .exec()
        .await?;
    Ok(())
}

/// 写入关联索引；`with_record` 为 false 时只建立索引，不写样本记录
pub async fn seed_sample(
    cache: &dyn BatchCache,
    subject: &Subject,
    aspect: &str,
    value: &str,
    with_record: bool,
) -> Result<()> {
    let batch = cache
        .batch()
        .add_member(KeyKind::SubjectAspectMap, aspect, &subject.absolute_path)
        .add_member(
            KeyKind::AspectSubjectMap,
            &subject.absolute_path.to_lowercase(),
            aspect,
        );
    let batch = if with_record {
        batch.write_record(
            KeyKind::Sample,
            &sample_name(&subject.absolute_path, aspect),
            sample_record(subject, aspect, value),
        )
    } else {
        batch
    };
    batch.exec().await?;
    Ok(())
}

pub fn memory_cache() -> Arc<MemoryBatchCache> {
    Arc::new(MemoryBatchCache::default())
}

/// 等待后台任务（如计数递减）执行完
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
