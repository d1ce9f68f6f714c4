//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 样本存储的键命名规则。

/// 默认键前缀
pub const DEFAULT_PREFIX: &str = "samsto";

/// 样本名中主题路径与切面名之间的分隔符
pub const SAMPLE_NAME_SEPARATOR: char = '|';

/// 缓存键类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// 主题哈希
    Subject,
    /// 样本哈希
    Sample,
    /// 主题 -> 切面集合
    SubjectAspectMap,
    /// 切面 -> 主题集合
    AspectSubjectMap,
    /// 标签 -> 主题集合
    SubjectTagMap,
}

impl KeyKind {
    pub fn segment(&self) -> &'static str {
        match self {
            KeyKind::Subject => "subject",
            KeyKind::Sample => "sample",
            KeyKind::SubjectAspectMap => "subaspmap",
            KeyKind::AspectSubjectMap => "aspsubmap",
            KeyKind::SubjectTagMap => "subtagmap",
        }
    }

    /// 记录类型对应的主索引段，集合类型没有主索引
    fn master_segment(&self) -> Option<&'static str> {
        match self {
            KeyKind::Subject => Some("subjects"),
            KeyKind::Sample => Some("samples"),
            _ => None,
        }
    }
}

/// 样本名：小写主题路径 + `|` + 切面名
pub fn sample_name(absolute_path: &str, aspect: &str) -> String {
    format!(
        "{}{}{}",
        absolute_path.to_lowercase(),
        SAMPLE_NAME_SEPARATOR,
        aspect
    )
}

/// 带前缀的键空间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 构造缓存键，名称部分一律小写
    pub fn key(&self, kind: KeyKind, name: &str) -> String {
        format!("{}:{}:{}", self.prefix, kind.segment(), name.to_lowercase())
    }

    /// 记录类型的主索引键
    pub fn master_index(&self, kind: KeyKind) -> Option<String> {
        kind.master_segment()
            .map(|segment| format!("{}:{}", self.prefix, segment))
    }
}
