//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! `subjects` 表实体。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "subjects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub absolute_path: String,
    pub parent_id: Option<Uuid>,
    pub parent_absolute_path: Option<String>,
    pub child_count: i32,
    /// JSON 数组
    pub tags: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
