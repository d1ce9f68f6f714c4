//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了命令行程序的日志和链路追踪初始化。

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// 初始化日志与 OpenTelemetry Tracing
///
/// 控制台输出受 `RUST_LOG` 控制，未设置时使用 `default_filter`。
/// 没有配置 exporter 时 tracer provider 不导出任何 span。
/// 重复调用时保留第一次安装的 subscriber。
pub fn init_tracing(service_name: &str, default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let provider = SdkTracerProvider::builder().build();
    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(service_name.to_string());

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(tracing_opentelemetry::layer().with_tracer(tracer));

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 关闭全局 tracer provider，刷新尚未导出的 span
pub fn shutdown_tracing() {
    global::shutdown_tracer_provider();
}
