//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存清理命令的实现。

use crate::backend::redis::RedisBatchCache;
use crate::cascade::{CascadeEngine, CascadeReport, NotifyPolicy};
use crate::cli::PurgeArgs;
use crate::config::Config;
use crate::database::{SeaOrmSubjectStore, SubjectStore};
use crate::metrics::GLOBAL_METRICS;
use crate::realtime::{NoopPublisher, RedisSamplePublisher, SamplePublisher};
use anyhow::{Context, Result};
use std::sync::Arc;

pub async fn execute(args: &PurgeArgs) -> Result<()> {
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    let store = SeaOrmSubjectStore::connect(&config.database).await?;
    let subject = store
        .find_by_absolute_path(&args.path)
        .await?
        .with_context(|| format!("Subject '{}' not found", args.path))?;

    let cache = RedisBatchCache::new(&config.redis, config.sample_store.key_space()).await?;
    let publisher: Arc<dyn SamplePublisher> = if config.realtime.enabled && !args.silent {
        Arc::new(RedisSamplePublisher::new(
            cache.connection_manager()?,
            config.realtime.channel.clone(),
        ))
    } else {
        Arc::new(NoopPublisher)
    };

    let policy = if args.silent {
        NotifyPolicy::Silent
    } else {
        NotifyPolicy::Publish
    };
    let engine = CascadeEngine::new(Arc::new(cache), publisher).with_notify_policy(policy);

    println!("Purging '{}' from cache...", subject.absolute_path);
    let report = engine.purge_subject_from_cache(&subject).await?;
    print_report(&report);

    Ok(())
}

fn print_report(report: &CascadeReport) {
    println!("\n=== Purge Report ===\n");
    println!("Aspects:          {}", report.aspects.join(", "));
    println!("Samples deleted:  {}", report.samples_deleted);
    println!("Notifications:    {}", report.notifications);
    println!("Tag memberships:  {}", report.tag_memberships_removed);
    println!(
        "Subject record:   {}",
        if report.subject_record_deleted {
            "deleted"
        } else {
            "absent"
        }
    );

    println!("\nMetrics:");
    for (key, value) in GLOBAL_METRICS.snapshot() {
        println!("  {:<28} {}", key, value);
    }
}
