//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 关系存储模块
//!
//! 定义层级校验和变更所需的主题存储接口，并提供基于 Sea-ORM 的实现。

use crate::error::Result;
use crate::subject::Subject;
use async_trait::async_trait;
use uuid::Uuid;

pub mod entity;
pub mod sea_orm_store;

pub use sea_orm_store::SeaOrmSubjectStore;

/// 数据库类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// 从URL字符串解析数据库类型
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            DatabaseType::PostgreSQL
        } else if url.starts_with("mysql://") {
            DatabaseType::MySQL
        } else {
            DatabaseType::SQLite
        }
    }
}

/// 主题存储接口
///
/// 路径查找不区分大小写。`child_count` 的增减不要求与其他写入协调。
#[async_trait]
pub trait SubjectStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Subject>>;

    /// 按绝对路径查找，不区分大小写
    async fn find_by_absolute_path(&self, absolute_path: &str) -> Result<Option<Subject>>;

    /// 子节点计数减一，不会低于零
    async fn decrement_child_count(&self, id: Uuid) -> Result<()>;

    async fn increment_child_count(&self, id: Uuid) -> Result<()>;

    async fn insert(&self, subject: &Subject) -> Result<()>;

    /// 持久化主题字段，child_count 除外（只由增减操作维护）
    async fn update(&self, subject: &Subject) -> Result<()>;

    /// 删除主题，返回是否存在
    async fn delete(&self, id: Uuid) -> Result<bool>;
}
