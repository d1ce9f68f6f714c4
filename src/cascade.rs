//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 缓存级联删除引擎。
//!
//! 主题被删除（或需要整体移出缓存）时，枚举所有引用它的缓存条目，
//! 以一个批处理删除，并为每个实际存在过的样本发布一条删除通知。
//! 每一步都按键幂等，整次级联可以在瞬时失败后完整重试。

use crate::backend::BatchCache;
use crate::error::Result;
use crate::keys::{sample_name, KeyKind};
use crate::metrics::GLOBAL_METRICS;
use crate::realtime::{SampleEvent, SamplePublisher};
use crate::subject::{CacheRecord, Subject};
use chrono::{SecondsFormat, Utc};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// 读取样本记录的结果分组
pub const SAMPLES_GROUP: &str = "samples";
/// 删除样本键的结果分组
pub const DELETED_GROUP: &str = "deleted";
/// 通知中被刷新的时间戳字段
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// 级联时是否发布通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyPolicy {
    #[default]
    Publish,
    Silent,
}

/// 一次级联的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// 关联索引中读到的切面
    pub aspects: Vec<String>,
    /// 实际删除的样本键数量
    pub samples_deleted: usize,
    /// 已发布的删除通知数量
    pub notifications: usize,
    /// 移除的标签索引成员数量
    pub tag_memberships_removed: usize,
    /// 主题自身的缓存记录是否存在并已删除
    pub subject_record_deleted: bool,
}

/// 缓存级联引擎
#[derive(Clone)]
pub struct CascadeEngine {
    cache: Arc<dyn BatchCache>,
    publisher: Arc<dyn SamplePublisher>,
    policy: NotifyPolicy,
}

impl CascadeEngine {
    pub fn new(cache: Arc<dyn BatchCache>, publisher: Arc<dyn SamplePublisher>) -> Self {
        Self {
            cache,
            publisher,
            policy: NotifyPolicy::Publish,
        }
    }

    /// `purge_subject_from_cache` 使用的通知策略
    pub fn with_notify_policy(mut self, policy: NotifyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn notify_policy(&self) -> NotifyPolicy {
        self.policy
    }

    /// 删除主题的所有样本条目并发布删除通知
    ///
    /// 在一次流水线中：
    /// 1. 从每个切面的 切面->主题 索引中移除该主题；
    /// 2. 删除主题的 主题->切面 关联索引；
    /// 3. 读取每个样本记录（删除前读取，作为通知内容）；
    /// 4. 删除每个样本键。
    ///
    /// 不存在的记录不发通知。
    #[instrument(skip(self, subject), level = "debug", fields(subject = %subject.absolute_path))]
    pub async fn purge_subject_cascade(
        &self,
        subject: &Subject,
        notify: NotifyPolicy,
    ) -> Result<CascadeReport> {
        let started = Instant::now();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let aspects = self
            .cache
            .read_set(KeyKind::SubjectAspectMap, &subject.absolute_path)
            .await?;
        let sample_names: Vec<String> = aspects
            .iter()
            .map(|aspect| sample_name(&subject.absolute_path, aspect))
            .collect();
        let member = subject.absolute_path.to_lowercase();

        let mut results = aspects
            .iter()
            .fold(self.cache.batch(), |batch, aspect| {
                batch.delete_member(KeyKind::AspectSubjectMap, &member, aspect)
            })
            .delete_key(KeyKind::SubjectAspectMap, &subject.absolute_path)
            .read_then_collect(&sample_names, SAMPLES_GROUP, |batch, name| {
                batch.read_record(KeyKind::Sample, name)
            })
            .then_for_each(&sample_names, DELETED_GROUP, |batch, name| {
                batch.delete_key(KeyKind::Sample, name)
            })
            .exec()
            .await?;

        let samples_deleted = usize::try_from(results.total(DELETED_GROUP)).unwrap_or(0);
        let records: Vec<CacheRecord> = results
            .take_records(SAMPLES_GROUP)
            .into_iter()
            .flatten()
            .collect();

        let notifications = match notify {
            NotifyPolicy::Publish => self.publish_deleted(records, &now).await?,
            NotifyPolicy::Silent => 0,
        };

        GLOBAL_METRICS.record_cascade(samples_deleted as u64, notifications as u64);
        GLOBAL_METRICS.record_duration("cascade", started.elapsed().as_secs_f64());
        debug!(
            "Cascade done: aspects={}, samples_deleted={}, notifications={}",
            aspects.len(),
            samples_deleted,
            notifications
        );

        Ok(CascadeReport {
            aspects,
            samples_deleted,
            notifications,
            ..Default::default()
        })
    }

    /// 删除主题自身的缓存记录和所有样本条目
    ///
    /// 三个分支并发执行：移除标签索引成员、删除主题记录、样本级联。
    /// 任一分支失败即返回该错误，已完成的删除不会回滚。
    #[instrument(skip(self, subject), level = "info", fields(subject = %subject.absolute_path))]
    pub async fn purge_subject_from_cache(&self, subject: &Subject) -> Result<CascadeReport> {
        let (tag_memberships_removed, subject_record_deleted, report) = tokio::try_join!(
            self.remove_subject_tags(subject),
            self.delete_subject_record(subject),
            self.purge_subject_cascade(subject, self.policy),
        )?;

        info!(
            "Purged {} from cache: samples={}, tags={}",
            subject.absolute_path, report.samples_deleted, tag_memberships_removed
        );
        Ok(CascadeReport {
            tag_memberships_removed,
            subject_record_deleted,
            ..report
        })
    }

    /// 从主题所属的每个标签索引中移除该主题
    async fn remove_subject_tags(&self, subject: &Subject) -> Result<usize> {
        let member = subject.absolute_path.to_lowercase();
        let results = self
            .cache
            .batch()
            .then_for_each(&subject.tags, "tags", |batch, tag| {
                batch.delete_member(KeyKind::SubjectTagMap, &member, tag)
            })
            .exec()
            .await?;
        Ok(usize::try_from(results.total("tags")).unwrap_or(0))
    }

    async fn delete_subject_record(&self, subject: &Subject) -> Result<bool> {
        let results = self
            .cache
            .batch()
            .then_for_each(
                std::slice::from_ref(&subject.absolute_path),
                "subject",
                |batch, path| batch.delete_key(KeyKind::Subject, path),
            )
            .exec()
            .await?;
        Ok(results.total("subject") > 0)
    }

    /// 刷新时间戳后并发发布删除通知，全部完成才返回
    async fn publish_deleted(&self, records: Vec<CacheRecord>, now: &str) -> Result<usize> {
        let publisher = &self.publisher;
        let sends = records.into_iter().map(|mut record| {
            record.insert(UPDATED_AT_FIELD.to_string(), now.to_string());
            async move { publisher.publish(&record, SampleEvent::Delete).await }
        });
        Ok(try_join_all(sends).await?.len())
    }
}
