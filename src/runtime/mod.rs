//! 同步运行时
//!
//! 把配置、Provider 目录、对账器与调度器组装在一起，提供两个进程入口：
//! - **once**：执行一次对账周期后返回
//! - **watch**：按固定间隔持续对账，直到收到关闭信号
//!
//! # 使用示例
//!
//! ```rust,no_run
//! use flare_registry_sync::config::SyncConfig;
//! use flare_registry_sync::provider::ProviderCatalog;
//! use flare_registry_sync::runtime::{RunMode, SyncRuntime};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SyncConfig::load_from_file("flare-sync.toml")?;
//! let catalog = ProviderCatalog::builtin()?;
//!
//! SyncRuntime::build(&config, &catalog)?
//!     .run_until_signal(RunMode::Watch)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod runtime;
pub mod signal;

pub use config::RuntimeConfig;
pub use runtime::{RunMode, SyncRuntime};
pub use signal::shutdown_signal;
