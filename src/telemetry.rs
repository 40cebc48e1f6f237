//! Telemetry - tracing 订阅器初始化
//!
//! 库内部只发 `tracing` 事件；是否以及如何安装订阅器由宿主决定。

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// 初始化全局日志订阅器
///
/// 过滤规则为 `{level},guildvox={level}`，`RUST_LOG` 环境变量优先。
/// 进程内只能调用一次。
pub fn init(config: &LogConfig) {
    let log_filter = format!("{},guildvox={}", config.level, config.level);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&log_filter));

    if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}
