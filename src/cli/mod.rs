//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "subjectcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "purge", about = "Purge a subject and its samples from the cache")]
    Purge(PurgeArgs),

    #[command(name = "aspects", about = "List aspects cached for a subject")]
    Aspects(AspectsArgs),

    #[command(name = "check-config", about = "Parse and validate a configuration file")]
    CheckConfig(CheckConfigArgs),
}

#[derive(Parser, Debug)]
pub struct PurgeArgs {
    #[arg(short, long, help = "Path to the TOML configuration file")]
    pub config: PathBuf,

    #[arg(short, long, help = "Absolute path of the subject, e.g. Earth.Europe")]
    pub path: String,

    #[arg(short, long, help = "Delete without publishing sample notifications")]
    pub silent: bool,
}

#[derive(Parser, Debug)]
pub struct AspectsArgs {
    #[arg(short, long, help = "Path to the TOML configuration file")]
    pub config: PathBuf,

    #[arg(short, long, help = "Absolute path of the subject")]
    pub path: String,
}

#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    #[arg(short, long, help = "Path to the TOML configuration file")]
    pub config: PathBuf,
}

mod aspects;
mod check_config;
mod purge;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::telemetry::init_tracing("subjectcache", "info");

    let result = match &cli.command {
        Commands::Purge(args) => purge::execute(args).await,
        Commands::Aspects(args) => aspects::execute(args).await,
        Commands::CheckConfig(args) => check_config::execute(args),
    };

    crate::telemetry::shutdown_tracing();
    result
}
