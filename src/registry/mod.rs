//! 服务注册中心
//!
//! 注册中心需要实现三个方法以保持存储干净：获取当前状态、注销孤儿服务、注册/更新期望服务

pub mod consul;

pub use consul::{ConsulAgentRegistry, ConsulCatalogRegistry, ConsulClient};

use crate::error::{ProviderError, ValidationError};
use crate::service::{Service, Services};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// 服务注册中心 Trait
#[async_trait]
pub trait Registry: Send + Sync {
    /// 获取当前已注册的完整服务集合（范围由后端决定，例如公共标签）
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Services, ProviderError>;

    /// 注册服务（幂等 upsert）
    ///
    /// 调用方负责先执行 [`validate`](Registry::validate)，实现中不再重复校验。
    /// [`Reconciler`](crate::reconciler::Reconciler) 是唯一的校验入口。
    async fn register(
        &self,
        cancel: &CancellationToken,
        service: &Service,
    ) -> Result<(), ProviderError>;

    /// 注销服务（幂等，注销不存在的服务视为成功）
    async fn deregister(
        &self,
        cancel: &CancellationToken,
        service: &Service,
    ) -> Result<(), ProviderError>;

    /// 注册前校验
    ///
    /// 默认只执行基础校验；需要额外检查的后端应通过
    /// [`validate_with`](crate::service::validate_with) 组合，保证基础校验先执行
    fn validate(&self, service: &Service) -> Result<(), ValidationError> {
        service.validate()
    }
}
