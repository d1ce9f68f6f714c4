//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了层级变更与缓存级联的错误类型。

use thiserror::Error;

/// 主题系统错误类型枚举
///
/// 前四个变体是层级校验失败，调用方必须据此中止提交；
/// 其余变体来自缓存、关系存储和配置等外部协作者。
#[derive(Error, Debug)]
pub enum SubjectError {
    /// 引用的父主题不存在
    #[error("ParentSubjectNotFound: {0}")]
    ParentSubjectNotFound(String),

    /// 主题的父引用指向自身
    #[error("IllegalSelfParenting: {0}")]
    IllegalSelfParenting(String),

    /// parentId 与 parentAbsolutePath 指向不同的主题
    #[error("ParentSubjectNotMatch: {0}")]
    ParentSubjectNotMatch(String),

    /// 目标路径已被另一个主题占用
    #[error("SubjectAlreadyExistsUnderParent: {0}")]
    SubjectAlreadyExistsUnderParent(String),

    /// 主题不存在
    #[error("Subject not found: {0}")]
    SubjectNotFound(String),

    /// 主题名称不合法
    #[error("Invalid subject name: {0}")]
    InvalidName(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 缓存操作失败
    #[error("Cache operation failed: {0}")]
    CacheError(String),

    /// 通知发布失败
    #[error("Publish failed: {0}")]
    PublishError(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Sea-ORM数据库错误
    #[error("Sea-ORM error: {0}")]
    SeaOrmError(#[from] sea_orm::DbErr),

    /// Redis错误
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SubjectError {
    /// 是否为层级校验失败
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SubjectError::ParentSubjectNotFound(_)
                | SubjectError::IllegalSelfParenting(_)
                | SubjectError::ParentSubjectNotMatch(_)
                | SubjectError::SubjectAlreadyExistsUnderParent(_)
                | SubjectError::InvalidName(_)
        )
    }
}

impl From<serde_json::Error> for SubjectError {
    fn from(e: serde_json::Error) -> Self {
        SubjectError::Serialization(e.to_string())
    }
}

/// 操作结果类型别名
pub type Result<T> = std::result::Result<T, SubjectError>;
