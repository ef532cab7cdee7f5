//! 日志初始化
//!
//! 库代码只通过 `tracing` 宏输出事件，订阅器由进程入口调用 [`init`] 安装。
//! 未安装订阅器时事件为空操作。

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 安装全局 tracing 订阅器
///
/// `RUST_LOG` 优先于配置中的日志级别
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log level \"{}\"", config.level))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("failed to install tracing subscriber")?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("failed to install tracing subscriber")?;
    }
    Ok(())
}
