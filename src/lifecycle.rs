//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 主题生命周期钩子。
//!
//! 把校验、变更、持久化和缓存清理按固定顺序串起来：
//! 结构性修改在提交前校验并暂存，删除在提交后清理缓存。

use crate::cascade::{CascadeEngine, CascadeReport, NotifyPolicy};
use crate::database::SubjectStore;
use crate::error::{Result, SubjectError};
use crate::hierarchy::{
    assert_parent_references_match, validate_parent_id, validate_parent_path, HierarchyMutator,
};
use crate::subject::{validate_name, Subject};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// 主题生命周期钩子
#[derive(Clone)]
pub struct SubjectHooks {
    store: Arc<dyn SubjectStore>,
    mutator: HierarchyMutator,
    cascade: CascadeEngine,
}

impl SubjectHooks {
    pub fn new(store: Arc<dyn SubjectStore>, cascade: CascadeEngine) -> Self {
        Self {
            mutator: HierarchyMutator::new(Arc::clone(&store)),
            store,
            cascade,
        }
    }

    pub fn cascade(&self) -> &CascadeEngine {
        &self.cascade
    }

    /// 解析新的父引用
    ///
    /// 同时给出 id 和路径时两者必须指向同一主题；只给出一个时，
    /// 另一个由解析出的父主题补齐。
    async fn resolve_parent(
        &self,
        subject: &Subject,
        parent_id: Option<Uuid>,
        parent_absolute_path: Option<&str>,
    ) -> Result<Option<Subject>> {
        let by_id = match parent_id {
            Some(id) => Some(validate_parent_id(self.store.as_ref(), id, subject.id).await?),
            None => None,
        };
        let by_path = match parent_absolute_path {
            Some(path) => {
                Some(validate_parent_path(self.store.as_ref(), path, &subject.absolute_path).await?)
            }
            None => None,
        };

        match (by_id, by_path) {
            (Some(a), Some(b)) => {
                assert_parent_references_match(
                    a.id,
                    parent_absolute_path.unwrap_or_default(),
                    &a,
                    &b,
                )?;
                Ok(Some(a))
            }
            (Some(parent), None) | (None, Some(parent)) => Ok(Some(parent)),
            (None, None) => Ok(None),
        }
    }

    /// 提交前调用：校验新的父引用并暂存路径字段
    ///
    /// 返回暂存后的主题，任何错误都应中止提交。
    #[instrument(skip(self, subject), level = "debug", fields(subject = %subject.absolute_path))]
    pub async fn before_parent_change(
        &self,
        subject: Subject,
        parent_id: Option<Uuid>,
        parent_absolute_path: Option<String>,
    ) -> Result<Subject> {
        let parent = self
            .resolve_parent(&subject, parent_id, parent_absolute_path.as_deref())
            .await?;
        let (new_parent_id, new_parent_path) = match parent {
            Some(parent) => (Some(parent.id), Some(parent.absolute_path)),
            None => (None, None),
        };
        self.mutator
            .retarget_parent(subject, new_parent_id, new_parent_path)
            .await
    }

    /// 提交后调用：新父节点的子节点计数加一
    pub async fn after_parent_change(&self, subject: &Subject) -> Result<()> {
        if let Some(parent_id) = subject.parent_id {
            self.store.increment_child_count(parent_id).await?;
        }
        Ok(())
    }

    /// 移动主题：校验、暂存、持久化并调整新父节点计数
    #[instrument(skip(self, subject), level = "info", fields(subject = %subject.absolute_path))]
    pub async fn move_subject(
        &self,
        subject: Subject,
        parent_id: Option<Uuid>,
        parent_absolute_path: Option<String>,
    ) -> Result<Subject> {
        let staged = self
            .before_parent_change(subject, parent_id, parent_absolute_path)
            .await?;
        self.store.update(&staged).await?;
        self.after_parent_change(&staged).await?;
        Ok(staged)
    }

    /// 重命名主题，父节点不变
    #[instrument(skip(self, subject), level = "info", fields(subject = %subject.absolute_path))]
    pub async fn rename_subject(&self, mut subject: Subject, new_name: &str) -> Result<Subject> {
        validate_name(new_name)?;
        subject.name = new_name.to_string();
        let parent_id = subject.parent_id;
        let parent_path = subject.parent_absolute_path.clone();
        let staged = self
            .mutator
            .retarget_parent(subject, parent_id, parent_path)
            .await?;
        self.store.update(&staged).await?;
        self.after_parent_change(&staged).await?;
        Ok(staged)
    }

    /// 创建主题：校验名称与父引用后插入
    #[instrument(skip(self, subject), level = "info", fields(subject = %subject.absolute_path))]
    pub async fn create_subject(&self, subject: Subject) -> Result<Subject> {
        validate_name(&subject.name)?;
        let parent = self
            .resolve_parent(
                &subject,
                subject.parent_id,
                subject.parent_absolute_path.as_deref(),
            )
            .await?;
        let staged = self
            .mutator
            .retarget_parent(
                Subject {
                    parent_id: None,
                    ..subject
                },
                parent.as_ref().map(|p| p.id),
                parent.map(|p| p.absolute_path),
            )
            .await?;
        self.store.insert(&staged).await?;
        self.after_parent_change(&staged).await?;
        Ok(staged)
    }

    /// 提交后调用：父节点计数减一，并清理缓存
    #[instrument(skip(self, subject), level = "info", fields(subject = %subject.absolute_path))]
    pub async fn after_delete(&self, subject: &Subject) -> Result<CascadeReport> {
        if let Some(parent_id) = subject.parent_id {
            self.store.decrement_child_count(parent_id).await?;
        }
        self.cascade.purge_subject_from_cache(subject).await
    }

    /// 删除主题并清理缓存
    pub async fn delete_subject(&self, subject: &Subject) -> Result<CascadeReport> {
        if !self.store.delete(subject.id).await? {
            return Err(SubjectError::SubjectNotFound(subject.absolute_path.clone()));
        }
        self.after_delete(subject).await
    }

    /// 路径变更后可选调用：清理旧路径下的样本条目
    ///
    /// 默认的钩子顺序不会调用它，旧路径下的样本键会一直保留到自行过期或被覆盖。
    pub async fn after_path_change(&self, previous: &Subject) -> Result<CascadeReport> {
        debug!("Purging samples under previous path {}", previous.absolute_path);
        let report = self
            .cascade
            .purge_subject_cascade(previous, NotifyPolicy::Publish)
            .await?;
        info!(
            "Removed {} samples cached under {}",
            report.samples_deleted, previous.absolute_path
        );
        Ok(report)
    }
}
