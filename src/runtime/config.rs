//! 运行时配置模块

use std::time::Duration;

/// 运行时配置
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// 收到关闭信号后等待当前周期结束的时间（默认 5 秒）
    pub shutdown_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl RuntimeConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置关闭超时时间
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}
