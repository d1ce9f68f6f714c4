//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 关系存储实体定义。

pub mod subject;
