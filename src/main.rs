//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块是缓存维护命令行的入口点。

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    subjectcache::cli::run().await
}
