//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 父引用校验。
//!
//! 在结构性修改提交之前调用，只读，不产生任何副作用。

use crate::database::SubjectStore;
use crate::error::{Result, SubjectError};
use crate::metrics::GLOBAL_METRICS;
use crate::subject::{ParentField, Subject};
use tracing::{debug, instrument};
use uuid::Uuid;

/// 按字段查找主题，无法解析的 id 视为不存在
async fn find_by_field(
    store: &dyn SubjectStore,
    field: ParentField,
    value: &str,
) -> Result<Option<Subject>> {
    match field {
        ParentField::Id => match Uuid::parse_str(value) {
            Ok(id) => store.find_by_id(id).await,
            Err(_) => Ok(None),
        },
        ParentField::AbsolutePath => store.find_by_absolute_path(value).await,
    }
}

/// 校验父引用字段并返回父主题
///
/// * `parent_value` - 父引用的值（父 id 或父路径）
/// * `own_value` - 主题自身对应字段的值（id 或绝对路径）
/// * `field` - 引用的字段
///
/// 父主题不存在时返回 `ParentSubjectNotFound`；
/// 父引用等于自身时返回 `IllegalSelfParenting`。
/// id 和路径都按不区分大小写比较。
#[instrument(skip(store), level = "debug")]
pub async fn validate_parent_field(
    store: &dyn SubjectStore,
    parent_value: &str,
    own_value: &str,
    field: ParentField,
) -> Result<Subject> {
    let parent = match find_by_field(store, field, parent_value).await? {
        Some(parent) => parent,
        None => {
            GLOBAL_METRICS.record_validation_failure("ParentSubjectNotFound");
            return Err(SubjectError::ParentSubjectNotFound(format!(
                "{} not found.",
                parent_value
            )));
        }
    };

    if parent_value.to_lowercase() == own_value.to_lowercase() {
        GLOBAL_METRICS.record_validation_failure("IllegalSelfParenting");
        let parent_field = match field {
            ParentField::Id => "parentId",
            ParentField::AbsolutePath => "parentAbsolutePath",
        };
        return Err(SubjectError::IllegalSelfParenting(format!(
            "{} cannot equal {}: {}",
            parent_field, field, own_value
        )));
    }

    debug!("Parent resolved: {} -> {}", parent_value, parent.absolute_path);
    Ok(parent)
}

/// 按 id 校验父引用
pub async fn validate_parent_id(
    store: &dyn SubjectStore,
    parent_id: Uuid,
    own_id: Uuid,
) -> Result<Subject> {
    validate_parent_field(
        store,
        &parent_id.to_string(),
        &own_id.to_string(),
        ParentField::Id,
    )
    .await
}

/// 按绝对路径校验父引用
pub async fn validate_parent_path(
    store: &dyn SubjectStore,
    parent_absolute_path: &str,
    own_absolute_path: &str,
) -> Result<Subject> {
    validate_parent_field(
        store,
        parent_absolute_path,
        own_absolute_path,
        ParentField::AbsolutePath,
    )
    .await
}

/// 构造 `ParentSubjectNotMatch` 错误，消息中包含两个引用值
pub fn parent_not_match(parent_id: &str, parent_absolute_path: &str) -> SubjectError {
    GLOBAL_METRICS.record_validation_failure("ParentSubjectNotMatch");
    SubjectError::ParentSubjectNotMatch(format!(
        "parentId and parentAbsolutePath refer to different subjects. Found: {}, {}",
        parent_id, parent_absolute_path
    ))
}

/// 比较按 id 和按路径分别解析出的父主题
///
/// 不做任何查找，只比较调用方已解析的两条记录。
pub fn assert_parent_references_match(
    parent_id: Uuid,
    parent_absolute_path: &str,
    resolved_by_id: &Subject,
    resolved_by_path: &Subject,
) -> Result<()> {
    if resolved_by_id.id == resolved_by_path.id {
        Ok(())
    } else {
        Err(parent_not_match(
            &parent_id.to_string(),
            parent_absolute_path,
        ))
    }
}
