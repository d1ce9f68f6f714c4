//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 层级结构的校验与变更。

pub mod mutator;
pub mod validator;

pub use mutator::HierarchyMutator;
pub use validator::{
    assert_parent_references_match, parent_not_match, validate_parent_field, validate_parent_id,
    validate_parent_path,
};
