//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! Redis集成测试，Redis不可用时跳过

#[path = "../common/mod.rs"]
mod common;

use common::{
    generate_unique_prefix, is_redis_available, seed_sample, seed_subject, setup_logging,
    RecordingPublisher,
};
use redis::AsyncCommands;
use serial_test::serial;
use std::env;
use std::sync::Arc;
use subjectcache::backend::redis::RedisBatchCache;
use subjectcache::backend::BatchCache;
use subjectcache::cascade::CascadeEngine;
use subjectcache::keys::{sample_name, KeyKind, KeySpace};
use subjectcache::realtime::{RedisSamplePublisher, SampleEvent, SamplePublisher};
use subjectcache::subject::{CacheRecord, Subject};
use subjectcache::utils::create_standalone_config;

fn redis_url() -> String {
    env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// Redis不可用时返回 None
async fn connect() -> Option<RedisBatchCache> {
    setup_logging();
    let url = redis_url();
    if !is_redis_available(&url).await {
        println!("跳过测试: Redis不可用");
        return None;
    }
    let keys = KeySpace::new(generate_unique_prefix("samsto_test"));
    match RedisBatchCache::new(&create_standalone_config(&url), keys).await {
        Ok(cache) => Some(cache),
        Err(e) => {
            println!("跳过测试: Redis连接失败 - {}", e);
            None
        }
    }
}

async fn exists(cache: &RedisBatchCache, key: &str) -> bool {
    let mut conn = cache.connection_manager().unwrap();
    conn.exists(key).await.unwrap()
}

#[tokio::test]
#[serial]
async fn test_ping() {
    let Some(cache) = connect().await else {
        return;
    };
    assert!(cache.ping().await.is_ok());
}

#[tokio::test]
#[serial]
async fn test_batch_reads_missing_record_as_none() {
    let Some(cache) = connect().await else {
        return;
    };
    let cache: Arc<dyn BatchCache> = Arc::new(cache);

    let mut results = cache
        .batch()
        .read_then_collect(&["nobody|temperature".to_string()], "samples", |b, name| {
            b.read_record(KeyKind::Sample, name)
        })
        .exec()
        .await
        .unwrap();
    assert_eq!(results.take_records("samples"), vec![None]);
}

#[tokio::test]
#[serial]
async fn test_purge_from_cache_against_redis() {
    let Some(cache) = connect().await else {
        return;
    };
    let keys = cache.key_space().clone();
    let probe = cache.clone();
    let subject = Subject::child_of(&Subject::root("Earth"), "Station").with_tags(["outdoor"]);

    seed_subject(&cache, &subject).await.unwrap();
    seed_sample(&cache, &subject, "temperature", "21.5", true)
        .await
        .unwrap();
    seed_sample(&cache, &subject, "humidity", "40", true)
        .await
        .unwrap();
    seed_sample(&cache, &subject, "pressure", "", false)
        .await
        .unwrap();

    let publisher = Arc::new(RecordingPublisher::default());
    let engine = CascadeEngine::new(Arc::new(cache), publisher.clone());
    let report = engine.purge_subject_from_cache(&subject).await.unwrap();

    assert_eq!(report.aspects, vec!["humidity", "pressure", "temperature"]);
    assert_eq!(report.samples_deleted, 2);
    assert_eq!(report.notifications, 2);
    assert_eq!(report.tag_memberships_removed, 1);
    assert!(report.subject_record_deleted);
    assert_eq!(publisher.events().len(), 2);

    let checked = [
        keys.key(KeyKind::Subject, &subject.absolute_path),
        keys.key(KeyKind::SubjectAspectMap, &subject.absolute_path),
        keys.key(KeyKind::SubjectTagMap, "outdoor"),
        keys.key(KeyKind::AspectSubjectMap, "temperature"),
        keys.key(KeyKind::Sample, &sample_name(&subject.absolute_path, "temperature")),
        keys.key(KeyKind::Sample, &sample_name(&subject.absolute_path, "humidity")),
        keys.master_index(KeyKind::Sample).unwrap(),
        keys.master_index(KeyKind::Subject).unwrap(),
    ];
    for key in &checked {
        assert!(!exists(&probe, key).await, "{} should be gone", key);
    }
}

#[tokio::test]
#[serial]
async fn test_publisher_sends_envelope() {
    let Some(cache) = connect().await else {
        return;
    };
    let channel = generate_unique_prefix("sample_events");
    let publisher = RedisSamplePublisher::new(cache.connection_manager().unwrap(), channel);

    let mut record = CacheRecord::new();
    record.insert("name".to_string(), "earth|temperature".to_string());
    assert!(publisher.publish(&record, SampleEvent::Delete).await.is_ok());
}
