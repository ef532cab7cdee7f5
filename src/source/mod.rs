//! 服务来源（期望状态）
//!
//! Source 不感知两次 fetch 之间的变化，只返回当前声明的完整服务集合

pub mod file;

pub use file::{FileFormat, FileSource};

use crate::error::ProviderError;
use crate::service::Services;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// 服务来源 Trait
#[async_trait]
pub trait Source: Send + Sync {
    /// 获取本周期期望的完整服务集合
    ///
    /// 读取或解析失败必须返回错误，不能返回空列表；
    /// 空列表表示"没有声明任何服务"，是合法的业务状态
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Services, ProviderError>;
}
