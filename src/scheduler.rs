//! 固定间隔调度器
//!
//! 每个间隔触发一次对账周期。周期同步执行，下一次触发只会在上一周期结束后被观察到，
//! 因此不会出现重叠。周期失败只记录日志，不会停止循环。

use crate::reconciler::Reconcile;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// 定时器无法以零周期触发
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// 调度器
pub struct Scheduler {
    reconciler: Arc<dyn Reconcile>,
    interval: Duration,
}

impl Scheduler {
    /// 创建新的调度器，零间隔会被提升为 1ms
    pub fn new(reconciler: Arc<dyn Reconcile>, interval: Duration) -> Self {
        Self {
            reconciler,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 运行调度循环，直到令牌被取消
    ///
    /// 第一次触发发生在启动后一个间隔处
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?self.interval, "Scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Scheduler stopped");
                    return;
                }
                _ = ticker.tick() => {
                    debug!("Scheduler tick");
                    match self.reconciler.run(&cancel).await {
                        Ok(()) => {}
                        Err(e) if e.is_cancelled() => {
                            debug!("Reconciliation run interrupted by shutdown");
                        }
                        Err(e) => {
                            error!(error = %e, "failed to process reconciliation run");
                        }
                    }
                }
            }
        }
    }
}
