//! 测试用的 Source / Registry 实现
//!
//! 记录所有调用，并可按服务标识注入失败

#![allow(dead_code)]

use async_trait::async_trait;
use flare_registry_sync::error::{ProviderError, ValidationError};
use flare_registry_sync::registry::Registry;
use flare_registry_sync::service::{RequireNode, Service, Services, validate_with};
use flare_registry_sync::source::Source;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// 创建只包含名称和地址的服务
pub fn service(name: &str, address: &str) -> Service {
    Service::new(name, address)
}

/// 返回固定服务列表的 Source
#[derive(Default)]
pub struct MockSource {
    services: Services,
    fail: Option<String>,
    fetches: AtomicUsize,
}

impl MockSource {
    pub fn new(services: Vec<Service>) -> Self {
        Self {
            services: services.into(),
            ..Default::default()
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    async fn fetch(&self, _cancel: &CancellationToken) -> Result<Services, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.fail {
            Some(msg) => Err(ProviderError::backend(msg.clone())),
            None => Ok(self.services.clone()),
        }
    }
}

/// Registry 调用记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch,
    Register(String),
    Deregister(String),
}

/// 内存注册中心
///
/// register 按标识 upsert，deregister 按标识删除（不存在视为成功）
#[derive(Default)]
pub struct MockRegistry {
    services: Mutex<Vec<Service>>,
    calls: Mutex<Vec<Call>>,
    fail_fetch: Option<String>,
    fail_register: HashSet<String>,
    fail_deregister: HashSet<String>,
    require_node: bool,
    cancel_after_deregister: Option<CancellationToken>,
}

impl MockRegistry {
    pub fn new(registered: Vec<Service>) -> Self {
        Self {
            services: Mutex::new(registered),
            ..Default::default()
        }
    }

    pub fn with_failing_fetch(mut self, msg: &str) -> Self {
        self.fail_fetch = Some(msg.to_string());
        self
    }

    pub fn with_failing_register(mut self, identity: &str) -> Self {
        self.fail_register.insert(identity.to_string());
        self
    }

    pub fn with_failing_deregister(mut self, identity: &str) -> Self {
        self.fail_deregister.insert(identity.to_string());
        self
    }

    pub fn with_require_node(mut self) -> Self {
        self.require_node = true;
        self
    }

    /// 第一次注销后触发取消令牌
    pub fn with_cancel_after_deregister(mut self, token: CancellationToken) -> Self {
        self.cancel_after_deregister = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn registered(&self) -> Vec<Service> {
        self.services.lock().unwrap().clone()
    }

    pub fn register_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Register(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn deregister_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Deregister(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn fetch(&self, _cancel: &CancellationToken) -> Result<Services, ProviderError> {
        self.record(Call::Fetch);
        if let Some(msg) = &self.fail_fetch {
            return Err(ProviderError::backend(msg.clone()));
        }
        Ok(self.registered().into())
    }

    async fn register(
        &self,
        _cancel: &CancellationToken,
        service: &Service,
    ) -> Result<(), ProviderError> {
        let identity = service.identity().to_string();
        self.record(Call::Register(identity.clone()));
        if self.fail_register.contains(&identity) {
            return Err(ProviderError::backend("connection refused"));
        }
        let mut services = self.services.lock().unwrap();
        services.retain(|s| s.identity() != identity);
        services.push(service.clone());
        Ok(())
    }

    async fn deregister(
        &self,
        _cancel: &CancellationToken,
        service: &Service,
    ) -> Result<(), ProviderError> {
        let identity = service.identity().to_string();
        self.record(Call::Deregister(identity.clone()));
        if let Some(token) = &self.cancel_after_deregister {
            token.cancel();
        }
        if self.fail_deregister.contains(&identity) {
            return Err(ProviderError::backend("connection refused"));
        }
        self.services
            .lock()
            .unwrap()
            .retain(|s| s.identity() != identity);
        Ok(())
    }

    fn validate(&self, service: &Service) -> Result<(), ValidationError> {
        if self.require_node {
            validate_with(service, &[&RequireNode])
        } else {
            service.validate()
        }
    }
}
