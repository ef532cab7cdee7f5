//! 同步运行时实现

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::provider::ProviderCatalog;
use crate::reconciler::{ErrorPolicy, Reconcile, Reconciler};
use crate::registry::Registry;
use crate::runtime::config::RuntimeConfig;
use crate::runtime::signal::shutdown_signal;
use crate::scheduler::Scheduler;
use crate::source::Source;

/// 进程运行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 执行一次对账周期
    Once,
    /// 按固定间隔持续对账
    Watch,
}

/// 同步运行时
///
/// 持有一个对账器和驱动它的调度器。
///
/// # 使用示例
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use flare_registry_sync::reconciler::ErrorPolicy;
/// use flare_registry_sync::registry::ConsulAgentRegistry;
/// use flare_registry_sync::runtime::SyncRuntime;
/// use flare_registry_sync::source::FileSource;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(registry: ConsulAgentRegistry) -> anyhow::Result<()> {
/// let runtime = SyncRuntime::new(
///     Arc::new(FileSource::new("~/services.yml")),
///     Arc::new(registry),
///     ErrorPolicy::Exit,
///     Duration::from_secs(30),
/// );
/// runtime.run_once(&CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct SyncRuntime {
    reconciler: Arc<Reconciler>,
    scheduler: Scheduler,
    config: RuntimeConfig,
}

impl SyncRuntime {
    /// 由已构建的协作者创建运行时
    pub fn new(
        source: Arc<dyn Source>,
        registry: Arc<dyn Registry>,
        policy: ErrorPolicy,
        interval: Duration,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(source, registry, policy));
        let scheduler = Scheduler::new(reconciler.clone() as Arc<dyn Reconcile>, interval);
        Self {
            reconciler,
            scheduler,
            config: RuntimeConfig::default(),
        }
    }

    /// 按配置从 Provider 目录构建 Source 与 Registry
    pub fn build(config: &SyncConfig, catalog: &ProviderCatalog) -> Result<Self> {
        let source = catalog
            .lookup_source(&config.source.kind)?
            .build(&config.source.options)
            .with_context(|| format!("failed to create source \"{}\"", config.source.kind))?;

        let registry = catalog
            .lookup_registry(&config.registry.kind)?
            .build(&config.registry.options)
            .with_context(|| format!("failed to create registry \"{}\"", config.registry.kind))?;

        info!(
            source = %config.source.kind,
            registry = %config.registry.kind,
            exit_on_error = config.manager.exit_on_error,
            interval = ?config.scheduler.interval,
            "Sync runtime created"
        );

        Ok(Self::new(
            source,
            registry,
            config.manager.policy(),
            config.scheduler.interval,
        ))
    }

    /// 设置运行时配置
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// 执行一次对账周期
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        info!("Running single reconciliation");
        self.reconciler.run(cancel).await
    }

    /// 持续对账，直到令牌被取消
    pub async fn run_forever(&self, cancel: CancellationToken) {
        self.scheduler.run(cancel).await;
    }

    /// 运行直到完成或收到关闭信号
    ///
    /// 收到信号后取消令牌，并在 `shutdown_timeout` 内等待当前周期结束。
    /// 被取消的周期不视为错误。
    pub async fn run_until_signal(&self, mode: RunMode) -> Result<()> {
        let cancel = CancellationToken::new();
        let work = self.run_mode(mode, cancel.clone());
        tokio::pin!(work);

        tokio::select! {
            result = &mut work => return result,
            _ = shutdown_signal() => {
                cancel.cancel();
            }
        }

        match tokio::time::timeout(self.config.shutdown_timeout, work).await {
            Ok(result) => {
                info!("Sync runtime stopped");
                result
            }
            Err(_) => {
                warn!("Shutdown timeout, forcing exit");
                Ok(())
            }
        }
    }

    async fn run_mode(&self, mode: RunMode, cancel: CancellationToken) -> Result<()> {
        match mode {
            RunMode::Once => match self.run_once(&cancel).await {
                Err(e) if e.is_cancelled() => {
                    info!("Reconciliation cancelled");
                    Ok(())
                }
                result => result.context("failed to process reconciliation run"),
            },
            RunMode::Watch => {
                self.run_forever(cancel).await;
                Ok(())
            }
        }
    }
}
