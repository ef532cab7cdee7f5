//! 对账引擎
//!
//! 一个周期依次执行：
//! 1. 从 Source 获取期望服务集合
//! 2. 从 Registry 获取已注册服务集合
//! 3. 计算孤儿服务（已注册但不再声明）
//! 4. 注销孤儿服务
//! 5. 注册（更新）期望服务
//!
//! 单个服务的失败会被聚合而不是中断批处理，是否使整个周期失败由 [`ErrorPolicy`] 决定。
//! 获取失败总是使周期失败，且不会做任何修改。

use crate::error::{AggregateError, ApplyError, ProviderError, SyncError};
use crate::registry::Registry;
use crate::service::{Service, Services};
use crate::source::Source;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 单服务失败的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// 记录日志后继续，周期返回成功
    #[default]
    Continue,
    /// 聚合后立即返回错误
    Exit,
}

impl ErrorPolicy {
    pub fn from_exit_on_error(exit_on_error: bool) -> Self {
        if exit_on_error {
            ErrorPolicy::Exit
        } else {
            ErrorPolicy::Continue
        }
    }

    pub fn exit_on_error(&self) -> bool {
        matches!(self, ErrorPolicy::Exit)
    }
}

/// 单个对账周期的执行者
///
/// 调度器只依赖这个 Trait，便于替换与测试
#[async_trait]
pub trait Reconcile: Send + Sync {
    /// 执行一个完整周期
    async fn run(&self, cancel: &CancellationToken) -> Result<(), SyncError>;
}

/// 对账器
///
/// 除注入的协作者与策略外不持有任何状态
pub struct Reconciler {
    source: Arc<dyn Source>,
    registry: Arc<dyn Registry>,
    policy: ErrorPolicy,
}

impl Reconciler {
    /// 创建新的对账器
    pub fn new(source: Arc<dyn Source>, registry: Arc<dyn Registry>, policy: ErrorPolicy) -> Self {
        Self {
            source,
            registry,
            policy,
        }
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// 注销孤儿服务，收集全部失败
    async fn deregister_services(
        &self,
        cancel: &CancellationToken,
        services: &[&Service],
    ) -> Result<(), SyncError> {
        let mut errors = AggregateError::new();
        for service in services {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            if let Err(source) = self.registry.deregister(cancel, service).await {
                let err = ApplyError::Deregister {
                    identity: service.identity().to_string(),
                    source,
                };
                warn!(identity = %service.identity(), error = %err, "Deregistration failed");
                errors.add(err);
            }
        }
        errors.into_result().map_err(SyncError::Deregister)
    }

    /// 校验并注册期望服务，收集全部失败
    ///
    /// 校验失败的服务不会调用后端
    async fn register_services(
        &self,
        cancel: &CancellationToken,
        services: &Services,
    ) -> Result<(), SyncError> {
        let mut errors = AggregateError::new();
        for service in services {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            // 校验只在这里执行，注册中心实现不再重复
            let result = match self.registry.validate(service) {
                Ok(()) => self.registry.register(cancel, service).await,
                Err(e) => Err(ProviderError::Validation(e)),
            };
            if let Err(source) = result {
                let err = ApplyError::Register {
                    identity: service.identity().to_string(),
                    source,
                };
                warn!(identity = %service.identity(), error = %err, "Registration failed");
                errors.add(err);
            }
        }
        errors.into_result().map_err(SyncError::Register)
    }

    /// 按策略处理批处理结果：Exit 返回错误，Continue 只记录日志
    fn apply_policy(&self, cancel: &CancellationToken, result: Result<(), SyncError>) -> Result<(), SyncError> {
        match result {
            Err(SyncError::Cancelled) => Err(SyncError::Cancelled),
            Err(_) if cancel.is_cancelled() => Err(SyncError::Cancelled),
            Err(err) => {
                error!(error = %err, "Reconciliation step failed");
                match self.policy {
                    ErrorPolicy::Exit => Err(err),
                    ErrorPolicy::Continue => Ok(()),
                }
            }
            Ok(()) => Ok(()),
        }
    }
}

#[async_trait]
impl Reconcile for Reconciler {
    async fn run(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        info!("Fetching services from source");
        let incoming = self
            .source
            .fetch(cancel)
            .await
            .map_err(SyncError::SourceFetch)?;

        info!("Fetching services from registry");
        let registered = self
            .registry
            .fetch(cancel)
            .await
            .map_err(SyncError::RegistryFetch)?;

        info!(
            incoming = incoming.len(),
            registered = registered.len(),
            "Checking difference between registered services and incoming list"
        );
        let orphans = find_orphans(&incoming, &registered);
        if !orphans.is_empty() {
            info!(count = orphans.len(), "Deleting orphan services");
            let result = self.deregister_services(cancel, &orphans).await;
            self.apply_policy(cancel, result)?;
        }

        info!(count = incoming.len(), "Registering services in registry");
        let result = self.register_services(cancel, &incoming).await;
        self.apply_policy(cancel, result)?;

        info!("Reconciliation completed");
        Ok(())
    }
}

/// 计算孤儿服务：标识不在期望集合中的已注册服务（保持已注册集合的顺序）
pub fn find_orphans<'a>(incoming: &Services, registered: &'a Services) -> Vec<&'a Service> {
    let wanted = incoming.identities();
    registered
        .iter()
        .filter(|service| !wanted.contains(service.identity()))
        .collect()
}
