//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了关联索引查询命令的实现。

use crate::backend::redis::RedisBatchCache;
use crate::backend::BatchCache;
use crate::cli::AspectsArgs;
use crate::config::Config;
use crate::keys::{sample_name, KeyKind};
use anyhow::{Context, Result};

pub async fn execute(args: &AspectsArgs) -> Result<()> {
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let keys = config.sample_store.key_space();
    let cache = RedisBatchCache::new(&config.redis, keys.clone()).await?;

    let aspects = cache
        .read_set(KeyKind::SubjectAspectMap, &args.path)
        .await?;

    println!(
        "=== {} ===\n",
        keys.key(KeyKind::SubjectAspectMap, &args.path)
    );
    if aspects.is_empty() {
        println!("No aspects cached.");
        return Ok(());
    }
    for aspect in &aspects {
        println!(
            "  {:<24} {}",
            aspect,
            keys.key(KeyKind::Sample, &sample_name(&args.path, aspect))
        );
    }
    println!("\n{} aspect(s)", aspects.len());

    Ok(())
}
