//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 缓存级联删除集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{
    memory_cache, seed_sample, seed_subject, setup_logging, FailingPublisher, RecordingPublisher,
};
use serial_test::serial;
use std::sync::Arc;
use subjectcache::cascade::{CascadeEngine, NotifyPolicy, UPDATED_AT_FIELD};
use subjectcache::error::SubjectError;
use subjectcache::keys::{sample_name, KeyKind};
use subjectcache::metrics::GLOBAL_METRICS;
use subjectcache::realtime::SampleEvent;
use subjectcache::subject::Subject;

fn weather_station() -> Subject {
    let earth = Subject::root("Earth");
    Subject::child_of(&earth, "Station").with_tags(["outdoor", "Weather"])
}

#[tokio::test]
async fn test_cascade_deletes_samples_and_notifies_each() {
    setup_logging();
    let cache = memory_cache();
    let publisher = Arc::new(RecordingPublisher::default());
    let subject = weather_station();
    seed_sample(cache.as_ref(), &subject, "temperature", "21.5", true)
        .await
        .unwrap();
    seed_sample(cache.as_ref(), &subject, "humidity", "40", true)
        .await
        .unwrap();

    let engine = CascadeEngine::new(cache.clone(), publisher.clone());
    let report = engine
        .purge_subject_cascade(&subject, NotifyPolicy::Publish)
        .await
        .unwrap();

    assert_eq!(report.aspects, vec!["humidity", "temperature"]);
    assert_eq!(report.samples_deleted, 2);
    assert_eq!(report.notifications, 2);

    let keys = cache.key_space();
    for aspect in ["temperature", "humidity"] {
        let sample_key = keys.key(KeyKind::Sample, &sample_name(&subject.absolute_path, aspect));
        assert!(!cache.contains_key(&sample_key));
        assert!(!cache
            .members(&keys.key(KeyKind::AspectSubjectMap, aspect))
            .contains(&"earth.station".to_string()));
    }
    assert!(!cache.contains_key(&keys.key(KeyKind::SubjectAspectMap, &subject.absolute_path)));

    let events = publisher.events();
    assert_eq!(events.len(), 2);
    for (record, event) in &events {
        assert_eq!(*event, SampleEvent::Delete);
        assert_eq!(record.get("status").map(String::as_str), Some("OK"));
        let updated_at = record.get(UPDATED_AT_FIELD).unwrap();
        assert_ne!(updated_at, "2020-01-01T00:00:00.000Z");
        assert!(chrono::DateTime::parse_from_rfc3339(updated_at).is_ok());
    }
    let mut values: Vec<&str> = events
        .iter()
        .filter_map(|(record, _)| record.get("value").map(String::as_str))
        .collect();
    values.sort_unstable();
    assert_eq!(values, vec!["21.5", "40"]);
}

#[tokio::test]
async fn test_missing_sample_skips_notification_but_prunes_index() {
    let cache = memory_cache();
    let publisher = Arc::new(RecordingPublisher::default());
    let subject = weather_station();
    seed_sample(cache.as_ref(), &subject, "temperature", "21.5", true)
        .await
        .unwrap();
    seed_sample(cache.as_ref(), &subject, "pressure", "", false)
        .await
        .unwrap();

    let engine = CascadeEngine::new(cache.clone(), publisher.clone());
    let report = engine
        .purge_subject_cascade(&subject, NotifyPolicy::Publish)
        .await
        .unwrap();

    assert_eq!(report.aspects.len(), 2);
    assert_eq!(report.samples_deleted, 1);
    assert_eq!(report.notifications, 1);
    assert_eq!(
        publisher.events()[0].0.get("value").map(String::as_str),
        Some("21.5")
    );
    let keys = cache.key_space();
    assert!(cache
        .members(&keys.key(KeyKind::AspectSubjectMap, "pressure"))
        .is_empty());
}

#[tokio::test]
async fn test_cascade_without_aspects_is_a_no_op() {
    let cache = memory_cache();
    let publisher = Arc::new(RecordingPublisher::default());
    let engine = CascadeEngine::new(cache.clone(), publisher.clone());

    let report = engine
        .purge_subject_cascade(&Subject::root("empty"), NotifyPolicy::Publish)
        .await
        .unwrap();
    assert!(report.aspects.is_empty());
    assert_eq!(report.samples_deleted, 0);
    assert!(publisher.events().is_empty());
}

#[tokio::test]
async fn test_silent_cascade_deletes_without_publishing() {
    let cache = memory_cache();
    let publisher = Arc::new(RecordingPublisher::default());
    let subject = weather_station();
    seed_sample(cache.as_ref(), &subject, "temperature", "21.5", true)
        .await
        .unwrap();

    let engine = CascadeEngine::new(cache.clone(), publisher.clone());
    let report = engine
        .purge_subject_cascade(&subject, NotifyPolicy::Silent)
        .await
        .unwrap();

    assert_eq!(report.samples_deleted, 1);
    assert_eq!(report.notifications, 0);
    assert!(publisher.events().is_empty());
}

/// 重复执行只会找到空索引，不会出错
#[tokio::test]
async fn test_cascade_is_idempotent() {
    let cache = memory_cache();
    let publisher = Arc::new(RecordingPublisher::default());
    let subject = weather_station();
    seed_sample(cache.as_ref(), &subject, "temperature", "21.5", true)
        .await
        .unwrap();
    let engine = CascadeEngine::new(cache.clone(), publisher.clone());

    engine
        .purge_subject_cascade(&subject, NotifyPolicy::Publish)
        .await
        .unwrap();
    let again = engine
        .purge_subject_cascade(&subject, NotifyPolicy::Publish)
        .await
        .unwrap();

    assert_eq!(again.samples_deleted, 0);
    assert_eq!(publisher.events().len(), 1);
}

#[tokio::test]
async fn test_purge_from_cache_removes_every_artifact() {
    setup_logging();
    let cache = memory_cache();
    let publisher = Arc::new(RecordingPublisher::default());
    let subject = weather_station();
    seed_subject(cache.as_ref(), &subject).await.unwrap();
    seed_sample(cache.as_ref(), &subject, "temperature", "21.5", true)
        .await
        .unwrap();
    seed_sample(cache.as_ref(), &subject, "humidity", "40", true)
        .await
        .unwrap();
    let keys = cache.key_space().clone();
    let subject_key = keys.key(KeyKind::Subject, &subject.absolute_path);
    assert!(cache.contains_key(&subject_key));

    let engine = CascadeEngine::new(cache.clone(), publisher.clone());
    let report = engine.purge_subject_from_cache(&subject).await.unwrap();

    assert!(report.subject_record_deleted);
    assert_eq!(report.tag_memberships_removed, 2);
    assert_eq!(report.samples_deleted, 2);
    assert_eq!(report.notifications, 2);

    assert!(!cache.contains_key(&subject_key));
    let subject_index = keys.master_index(KeyKind::Subject).unwrap();
    assert!(!cache.members(&subject_index).contains(&subject_key));
    let sample_index = keys.master_index(KeyKind::Sample).unwrap();
    assert!(cache.members(&sample_index).is_empty());
    for tag in ["outdoor", "weather"] {
        assert!(!cache.contains_key(&keys.key(KeyKind::SubjectTagMap, tag)));
    }
    assert!(!cache.contains_key(&keys.key(KeyKind::SubjectAspectMap, &subject.absolute_path)));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_purge_from_cache_honours_engine_policy() {
    let cache = memory_cache();
    let publisher = Arc::new(RecordingPublisher::default());
    let subject = weather_station();
    seed_subject(cache.as_ref(), &subject).await.unwrap();
    seed_sample(cache.as_ref(), &subject, "temperature", "21.5", true)
        .await
        .unwrap();

    let engine = CascadeEngine::new(cache.clone(), publisher.clone())
        .with_notify_policy(NotifyPolicy::Silent);
    assert_eq!(engine.notify_policy(), NotifyPolicy::Silent);
    let report = engine.purge_subject_from_cache(&subject).await.unwrap();

    assert_eq!(report.samples_deleted, 1);
    assert!(publisher.events().is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_other_subjects_are_untouched() {
    let cache = memory_cache();
    let publisher = Arc::new(RecordingPublisher::default());
    let subject = weather_station();
    let neighbour = Subject::root("Mars").with_tags(["outdoor"]);
    for s in [&subject, &neighbour] {
        seed_subject(cache.as_ref(), s).await.unwrap();
        seed_sample(cache.as_ref(), s, "temperature", "1", true)
            .await
            .unwrap();
    }

    let engine = CascadeEngine::new(cache.clone(), publisher.clone());
    engine.purge_subject_from_cache(&subject).await.unwrap();

    let keys = cache.key_space();
    assert!(cache.contains_key(&keys.key(KeyKind::Subject, "Mars")));
    assert!(cache.contains_key(&keys.key(KeyKind::Sample, &sample_name("Mars", "temperature"))));
    assert_eq!(
        cache.members(&keys.key(KeyKind::AspectSubjectMap, "temperature")),
        vec!["mars".to_string()]
    );
    assert_eq!(
        cache.members(&keys.key(KeyKind::SubjectTagMap, "outdoor")),
        vec!["mars".to_string()]
    );
}

#[tokio::test]
async fn test_publisher_failure_surfaces_after_deletion() {
    let cache = memory_cache();
    let subject = weather_station();
    seed_sample(cache.as_ref(), &subject, "temperature", "21.5", true)
        .await
        .unwrap();

    let engine = CascadeEngine::new(cache.clone(), Arc::new(FailingPublisher));
    let err = engine
        .purge_subject_cascade(&subject, NotifyPolicy::Publish)
        .await
        .unwrap_err();

    assert!(matches!(err, SubjectError::PublishError(_)));
    let keys = cache.key_space();
    assert!(!cache.contains_key(
        &keys.key(KeyKind::Sample, &sample_name(&subject.absolute_path, "temperature"))
    ));
}

#[tokio::test]
#[serial]
async fn test_cascade_records_metrics() {
    let cache = memory_cache();
    let publisher = Arc::new(RecordingPublisher::default());
    let subject = weather_station();
    seed_sample(cache.as_ref(), &subject, "temperature", "21.5", true)
        .await
        .unwrap();
    let runs = GLOBAL_METRICS.counter("cascade:runs");
    let deleted = GLOBAL_METRICS.counter("cascade:samples_deleted");

    let engine = CascadeEngine::new(cache.clone(), publisher.clone());
    engine
        .purge_subject_cascade(&subject, NotifyPolicy::Publish)
        .await
        .unwrap();

    // 其他测试可能并发累加计数器
    assert!(GLOBAL_METRICS.counter("cascade:runs") > runs);
    assert!(GLOBAL_METRICS.counter("cascade:samples_deleted") > deleted);
    assert!(GLOBAL_METRICS
        .snapshot()
        .contains_key("cascade:avg_secs"));
}
