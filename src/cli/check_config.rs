//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了配置检查命令的实现。

use crate::cli::CheckConfigArgs;
use crate::config::Config;
use crate::database::DatabaseType;
use crate::utils::redaction::redact_connection_string;
use anyhow::{Context, Result};
use secrecy::ExposeSecret;

pub fn execute(args: &CheckConfigArgs) -> Result<()> {
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Invalid configuration: {}", args.config.display()))?;

    println!("✅ {} is valid\n", args.config.display());
    let database_url = config.database.url.expose_secret();
    println!("Redis mode:    {:?}", config.redis.mode);
    println!(
        "Redis:         {}",
        redact_connection_string(config.redis.connection_string.expose_secret())
    );
    println!(
        "Database:      {:?} ({})",
        DatabaseType::from_url(database_url),
        redact_connection_string(database_url)
    );
    println!("Key prefix:    {}", config.sample_store.key_prefix);
    if config.realtime.enabled {
        println!("Realtime:      {}", config.realtime.channel);
    } else {
        println!("Realtime:      disabled");
    }

    Ok(())
}
