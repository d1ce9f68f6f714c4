//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了主题（Subject）数据模型和缓存记录类型。

use crate::error::{Result, SubjectError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 缓存中的哈希记录（字段名 -> 值）
pub type CacheRecord = BTreeMap<String, String>;

lazy_static! {
    static ref NAME_PATTERN: Regex = Regex::new(r"^[0-9A-Za-z_\-]{1,60}$").unwrap();
}

/// 校验主题名称
///
/// 名称只能包含字母、数字、下划线和连字符，且不能包含路径分隔符 `.`
pub fn validate_name(name: &str) -> Result<()> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(SubjectError::InvalidName(format!(
            "{:?} must match {}",
            name,
            NAME_PATTERN.as_str()
        )))
    }
}

/// 根据父路径和名称计算绝对路径
pub fn join_path(parent_absolute_path: Option<&str>, name: &str) -> String {
    match parent_absolute_path {
        Some(parent) if !parent.is_empty() => format!("{}.{}", parent, name),
        _ => name.to_string(),
    }
}

/// 层级中的一个节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub absolute_path: String,
    pub parent_id: Option<Uuid>,
    pub parent_absolute_path: Option<String>,
    pub child_count: i32,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Subject {
    /// 创建根主题
    pub fn root(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            absolute_path: name.to_string(),
            parent_id: None,
            parent_absolute_path: None,
            child_count: 0,
            tags: Vec::new(),
        }
    }

    /// 在 `parent` 下创建子主题
    ///
    /// 不会修改 `parent.child_count`，计数由关系存储维护。
    pub fn child_of(parent: &Subject, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            absolute_path: join_path(Some(&parent.absolute_path), name),
            parent_id: Some(parent.id),
            parent_absolute_path: Some(parent.absolute_path.clone()),
            child_count: 0,
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none() && self.parent_absolute_path.is_none()
    }

    /// 转换为主题缓存记录
    pub fn to_cache_record(&self) -> Result<CacheRecord> {
        let mut record = CacheRecord::new();
        record.insert("id".to_string(), self.id.to_string());
        record.insert("name".to_string(), self.name.clone());
        record.insert("absolutePath".to_string(), self.absolute_path.clone());
        if let Some(parent_id) = self.parent_id {
            record.insert("parentId".to_string(), parent_id.to_string());
        }
        if let Some(parent_path) = &self.parent_absolute_path {
            record.insert("parentAbsolutePath".to_string(), parent_path.clone());
        }
        record.insert("childCount".to_string(), self.child_count.to_string());
        if !self.tags.is_empty() {
            // 缓存中标签以 JSON 数组形式存放
            record.insert("tags".to_string(), serde_json::to_string(&self.tags)?);
        }
        Ok(record)
    }
}

/// 父引用字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentField {
    /// 按 id 引用
    Id,
    /// 按绝对路径引用
    AbsolutePath,
}

impl ParentField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentField::Id => "id",
            ParentField::AbsolutePath => "absolutePath",
        }
    }
}

impl std::fmt::Display for ParentField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
