//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 基于 Sea-ORM 的主题存储实现，支持 PostgreSQL、MySQL 和 SQLite。

use super::entity::subject as subjects;
use super::{DatabaseType, SubjectStore};
use crate::config::DatabaseConfig;
use crate::error::{Result, SubjectError};
use crate::subject::Subject;
use crate::utils::redaction::redact_connection_string;
use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, NotSet, QueryFilter, Schema, Set, SqlErr,
};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

impl TryFrom<subjects::Model> for Subject {
    type Error = SubjectError;

    fn try_from(model: subjects::Model) -> Result<Self> {
        let tags = if model.tags.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&model.tags)?
        };
        Ok(Subject {
            id: model.id,
            name: model.name,
            absolute_path: model.absolute_path,
            parent_id: model.parent_id,
            parent_absolute_path: model.parent_absolute_path,
            child_count: model.child_count,
            tags,
        })
    }
}

fn to_active_model(subject: &Subject) -> Result<subjects::ActiveModel> {
    Ok(subjects::ActiveModel {
        id: Set(subject.id),
        name: Set(subject.name.clone()),
        absolute_path: Set(subject.absolute_path.clone()),
        parent_id: Set(subject.parent_id),
        parent_absolute_path: Set(subject.parent_absolute_path.clone()),
        child_count: Set(subject.child_count),
        tags: Set(serde_json::to_string(&subject.tags)?),
    })
}

/// 唯一约束冲突映射为路径冲突
fn map_write_error(err: DbErr, absolute_path: &str) -> SubjectError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            SubjectError::SubjectAlreadyExistsUnderParent(format!(
                "{} already exists.",
                absolute_path
            ))
        }
        _ => SubjectError::SeaOrmError(err),
    }
}

/// Sea-ORM 主题存储
#[derive(Debug, Clone)]
pub struct SeaOrmSubjectStore {
    db: DatabaseConnection,
}

impl SeaOrmSubjectStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// 按配置建立连接
    #[instrument(skip(config), level = "info")]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config.url.expose_secret().to_string();
        info!(
            "Connecting subject store ({:?}) at {}",
            DatabaseType::from_url(&url),
            redact_connection_string(&url)
        );
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.max_connections)
            .min_connections(0)
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .sqlx_logging(config.sqlx_logging);
        Ok(Self::new(Database::connect(opt).await?))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 创建 `subjects` 表（已存在时跳过）
    pub async fn create_schema(&self) -> Result<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);
        let mut statement = schema.create_table_from_entity(subjects::Entity);
        statement.if_not_exists();
        self.db.execute(backend.build(&statement)).await?;
        Ok(())
    }
}

#[async_trait]
impl SubjectStore for SeaOrmSubjectStore {
    #[instrument(skip(self), level = "debug")]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Subject>> {
        subjects::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Subject::try_from)
            .transpose()
    }

    #[instrument(skip(self), level = "debug")]
    async fn find_by_absolute_path(&self, absolute_path: &str) -> Result<Option<Subject>> {
        subjects::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(subjects::Column::AbsolutePath)))
                    .eq(absolute_path.to_lowercase()),
            )
            .one(&self.db)
            .await?
            .map(Subject::try_from)
            .transpose()
    }

    #[instrument(skip(self), level = "debug")]
    async fn decrement_child_count(&self, id: Uuid) -> Result<()> {
        let result = subjects::Entity::update_many()
            .col_expr(
                subjects::Column::ChildCount,
                Expr::col(subjects::Column::ChildCount).sub(1),
            )
            .filter(subjects::Column::Id.eq(id))
            .filter(subjects::Column::ChildCount.gt(0))
            .exec(&self.db)
            .await?;
        debug!("decrement_child_count: id={}, rows={}", id, result.rows_affected);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn increment_child_count(&self, id: Uuid) -> Result<()> {
        subjects::Entity::update_many()
            .col_expr(
                subjects::Column::ChildCount,
                Expr::col(subjects::Column::ChildCount).add(1),
            )
            .filter(subjects::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, subject), level = "debug", fields(path = %subject.absolute_path))]
    async fn insert(&self, subject: &Subject) -> Result<()> {
        subjects::Entity::insert(to_active_model(subject)?)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| map_write_error(e, &subject.absolute_path))?;
        Ok(())
    }

    #[instrument(skip(self, subject), level = "debug", fields(path = %subject.absolute_path))]
    async fn update(&self, subject: &Subject) -> Result<()> {
        // child_count 只由原子增减维护，调用方手里的副本可能已过期
        let model = subjects::ActiveModel {
            child_count: NotSet,
            ..to_active_model(subject)?
        };
        model
            .update(&self.db)
            .await
            .map_err(|e| map_write_error(e, &subject.absolute_path))?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = subjects::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
