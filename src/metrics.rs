//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了层级变更与缓存级联的指标收集。

use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{span, Level};

/// 指标收集器
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// 计数器，key 形如 "cascade:samples_deleted"
    pub counters: Arc<Mutex<BTreeMap<String, u64>>>,
    /// 操作耗时 key -> (累计秒数, 次数)
    pub operation_duration: Arc<Mutex<BTreeMap<String, (f64, u64)>>>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

impl Metrics {
    fn add(&self, key: &str, n: u64) {
        if let Ok(mut map) = self.counters.lock() {
            *map.entry(key.to_string()).or_insert(0) += n;
        }
    }

    /// 记录一次父引用变更
    pub fn record_retarget(&self) {
        self.add("hierarchy:retarget", 1);
    }

    /// 记录层级校验失败
    ///
    /// * `kind` - 错误类型名，例如 "IllegalSelfParenting"
    pub fn record_validation_failure(&self, kind: &str) {
        let span = span!(Level::DEBUG, "validation_failure", kind);
        let _enter = span.enter();
        self.add(&format!("hierarchy:rejected:{}", kind), 1);
    }

    /// 记录一次级联及其结果
    pub fn record_cascade(&self, samples_deleted: u64, notifications: u64) {
        self.add("cascade:runs", 1);
        self.add("cascade:samples_deleted", samples_deleted);
        self.add("cascade:notifications", notifications);
    }

    /// 记录操作耗时
    pub fn record_duration(&self, op: &str, duration_secs: f64) {
        if let Ok(mut map) = self.operation_duration.lock() {
            let entry = map.entry(op.to_string()).or_insert((0.0, 0));
            entry.0 += duration_secs;
            entry.1 += 1;
        }
    }

    /// 读取单个计数器
    pub fn counter(&self, key: &str) -> u64 {
        self.counters
            .lock()
            .map(|map| map.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// 导出所有计数器和平均耗时
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        if let Ok(map) = self.counters.lock() {
            for (k, v) in map.iter() {
                out.insert(k.clone(), *v as f64);
            }
        }
        if let Ok(map) = self.operation_duration.lock() {
            for (k, (total, count)) in map.iter() {
                if *count > 0 {
                    out.insert(format!("{}:avg_secs", k), total / *count as f64);
                }
            }
        }
        out
    }

    /// 清空所有指标
    pub fn reset(&self) {
        if let Ok(mut map) = self.counters.lock() {
            map.clear();
        }
        if let Ok(mut map) = self.operation_duration.lock() {
            map.clear();
        }
    }
}
