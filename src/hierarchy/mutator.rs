//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 层级变更：重新计算路径、检测冲突并暂存父引用字段。

use crate::database::SubjectStore;
use crate::error::{Result, SubjectError};
use crate::metrics::GLOBAL_METRICS;
use crate::subject::{join_path, Subject};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// 层级变更器
///
/// `parent_id`、`parent_absolute_path` 和 `absolute_path` 只通过
/// [`HierarchyMutator::retarget_parent`] 一起修改。
#[derive(Clone)]
pub struct HierarchyMutator {
    store: Arc<dyn SubjectStore>,
}

impl HierarchyMutator {
    pub fn new(store: Arc<dyn SubjectStore>) -> Self {
        Self { store }
    }

    /// 将主题挂到新的父节点下（或移到根）
    ///
    /// `subject` 携带的是修改前的父引用。步骤：
    /// 1. 旧父节点存在时，后台递减其 `child_count`，不等待结果，失败只记录日志；
    /// 2. 计算新路径；
    /// 3. 新路径（不区分大小写）已被其他主题占用时返回
    ///    `SubjectAlreadyExistsUnderParent`，不暂存任何字段；
    /// 4. 暂存新字段并返回，持久化由调用方负责。
    ///
    /// 递减与并发的其他移动没有协调，计数可能漂移。
    #[instrument(skip(self, subject), level = "debug", fields(subject = %subject.absolute_path))]
    pub async fn retarget_parent(
        &self,
        mut subject: Subject,
        new_parent_id: Option<Uuid>,
        new_parent_absolute_path: Option<String>,
    ) -> Result<Subject> {
        GLOBAL_METRICS.record_retarget();

        if let Some(previous_parent_id) = subject.parent_id {
            if let Some(old_parent) = self.store.find_by_id(previous_parent_id).await? {
                self.spawn_child_count_decrement(old_parent.id);
            }
        }

        let new_absolute_path = join_path(new_parent_absolute_path.as_deref(), &subject.name);

        if let Some(existing) = self.store.find_by_absolute_path(&new_absolute_path).await? {
            if existing.id != subject.id {
                GLOBAL_METRICS.record_validation_failure("SubjectAlreadyExistsUnderParent");
                return Err(SubjectError::SubjectAlreadyExistsUnderParent(format!(
                    "{} already exists.",
                    new_absolute_path
                )));
            }
        }

        debug!(
            "Staging {} -> {}",
            subject.absolute_path, new_absolute_path
        );
        subject.parent_id = new_parent_id;
        subject.parent_absolute_path = new_parent_absolute_path;
        subject.absolute_path = new_absolute_path;
        Ok(subject)
    }

    /// 后台递减子节点计数，不等待结果
    fn spawn_child_count_decrement(&self, parent_id: Uuid) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.decrement_child_count(parent_id).await {
                warn!("childCount decrement for {} failed: {}", parent_id, e);
            }
        });
    }
}
