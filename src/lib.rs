//! subjectcache - 主题层级变更与样本缓存级联清理
//!
//! 在主题树的结构性修改提交前完成父引用校验和路径字段暂存，
//! 在主题删除后以批处理清理其所有缓存条目并发布删除通知。

#![doc(html_root_url = "https://docs.rs/subjectcache/0.1.0")]

pub mod backend;
pub mod cascade;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod hierarchy;
pub mod keys;
pub mod lifecycle;
pub mod metrics;
pub mod realtime;
pub mod subject;
pub mod telemetry;
pub mod utils;

// Re-export commonly used items
pub use backend::{BatchCache, CacheBatch};
pub use cascade::{CascadeEngine, CascadeReport, NotifyPolicy};
pub use config::Config;
pub use database::{SeaOrmSubjectStore, SubjectStore};
pub use error::{Result, SubjectError};
pub use hierarchy::HierarchyMutator;
pub use lifecycle::SubjectHooks;
pub use realtime::{SampleEvent, SamplePublisher};
pub use subject::{CacheRecord, ParentField, Subject};

/// subjectcache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
