//! Consul agent 注册中心

use super::{ConsulClient, ConsulClientConfig, merge_tags, option_specs, quote, tag_from_options};
use crate::error::ProviderError;
use crate::provider::{ProviderOptions, RegistryProvider};
use crate::registry::Registry;
use crate::service::{Service, Services};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Provider 名称
pub const NAME: &str = "consul-agent";

/// 通过 Consul agent 注册服务
pub struct ConsulAgentRegistry {
    client: ConsulClient,
    tag: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    name: &'a str,
    tags: Vec<String>,
    address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    meta: &'a HashMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AgentService {
    #[serde(rename = "ID")]
    id: String,
    service: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    port: u16,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    meta: Option<HashMap<String, String>>,
}

impl From<AgentService> for Service {
    fn from(item: AgentService) -> Self {
        Service {
            name: item.service,
            address: item.address,
            id: Some(item.id),
            port: (item.port != 0).then_some(item.port),
            tags: item.tags.unwrap_or_default().into_iter().collect(),
            metadata: item.meta.unwrap_or_default(),
            node: None,
        }
    }
}

impl ConsulAgentRegistry {
    /// 创建新的 agent 注册中心
    pub fn new(client: ConsulClient, tag: impl Into<String>) -> Self {
        Self {
            client,
            tag: tag.into(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// 从 Provider 配置构建
    pub fn from_options(options: &ProviderOptions) -> Result<Self, ProviderError> {
        let client = ConsulClient::new(ConsulClientConfig::from_options(options)?)?;
        Ok(Self::new(client, tag_from_options(options)?))
    }

    /// Provider 描述
    pub fn provider() -> RegistryProvider {
        RegistryProvider::new(
            NAME,
            "Register services through the Consul agent API",
            option_specs(),
            |options| Ok(Arc::new(ConsulAgentRegistry::from_options(options)?)),
        )
    }
}

#[async_trait]
impl Registry for ConsulAgentRegistry {
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Services, ProviderError> {
        debug!(tag = %self.tag, "Fetching services from consul agent");
        let filter = format!("{} in Tags", quote(&self.tag));
        let registered: HashMap<String, AgentService> = self
            .client
            .get_json(cancel, &["v1", "agent", "services"], &[("filter", filter.as_str())])
            .await?;

        let mut items: Vec<AgentService> = registered.into_values().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items.into_iter().map(Service::from).collect())
    }

    async fn register(
        &self,
        cancel: &CancellationToken,
        service: &Service,
    ) -> Result<(), ProviderError> {
        let registration = AgentServiceRegistration {
            id: service.id.as_deref(),
            name: &service.name,
            tags: merge_tags(&self.tag, service),
            address: &service.address,
            port: service.port,
            meta: &service.metadata,
        };
        self.client
            .put_json(cancel, &["v1", "agent", "service", "register"], &registration)
            .await?;

        info!(identity = %service.identity(), "Service registered with consul agent");
        Ok(())
    }

    async fn deregister(
        &self,
        cancel: &CancellationToken,
        service: &Service,
    ) -> Result<(), ProviderError> {
        let identity = service.identity();
        let segments = ["v1", "agent", "service", "deregister", identity];
        match self.client.put(cancel, &segments).await {
            Ok(()) => {
                info!(identity = %identity, "Service deregistered from consul agent");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(identity = %identity, "Service already absent from consul agent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
