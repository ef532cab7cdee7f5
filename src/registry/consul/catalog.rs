//! Consul catalog 注册中心
//!
//! 按节点粒度直接写入 catalog，适用于没有本地 agent 的外部服务。
//! 注册与注销都需要节点信息，因此 fetch 返回的服务总是携带 `Node`。

use super::{ConsulClient, ConsulClientConfig, merge_tags, option_specs, quote, tag_from_options};
use crate::error::{ProviderError, ValidationError};
use crate::provider::{ProviderOptions, RegistryProvider};
use crate::registry::Registry;
use crate::service::{Node, RequireNode, Service, Services, validate_with};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Provider 名称
pub const NAME: &str = "consul-catalog";

/// 通过 Consul catalog 注册服务
pub struct ConsulCatalogRegistry {
    client: ConsulClient,
    tag: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogRegistration<'a> {
    node: &'a str,
    address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    datacenter: Option<&'a str>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    node_meta: &'a HashMap<String, String>,
    service: CatalogServiceRegistration<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogServiceRegistration<'a> {
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    service: &'a str,
    tags: Vec<String>,
    address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    meta: &'a HashMap<String, String>,
    enable_tag_override: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogDeregistration<'a> {
    node: &'a str,
    #[serde(rename = "ServiceID")]
    service_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    datacenter: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogService {
    node: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    datacenter: Option<String>,
    #[serde(default)]
    node_meta: Option<HashMap<String, String>>,
    #[serde(rename = "ServiceID")]
    service_id: String,
    service_name: String,
    #[serde(default)]
    service_address: String,
    #[serde(default)]
    service_port: u16,
    #[serde(default)]
    service_tags: Option<Vec<String>>,
    #[serde(default)]
    service_meta: Option<HashMap<String, String>>,
}

impl From<CatalogService> for Service {
    fn from(item: CatalogService) -> Self {
        Service {
            name: item.service_name,
            address: item.service_address,
            id: Some(item.service_id),
            port: (item.service_port != 0).then_some(item.service_port),
            tags: item.service_tags.unwrap_or_default().into_iter().collect(),
            metadata: item.service_meta.unwrap_or_default(),
            node: Some(Node {
                node: item.node,
                address: item.address,
                datacenter: item.datacenter.filter(|dc| !dc.is_empty()),
                metadata: item.node_meta.unwrap_or_default(),
            }),
        }
    }
}

impl ConsulCatalogRegistry {
    /// 创建新的 catalog 注册中心
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
            "Register services at node level through the Consul catalog API",
            option_specs(),
            |options| Ok(Arc::new(ConsulCatalogRegistry::from_options(options)?)),
        )
    }

    /// 服务数据中心优先，其次为客户端配置的数据中心
    fn datacenter<'a>(&'a self, node: &'a Node) -> Option<&'a str> {
        node.datacenter.as_deref().or(self.client.datacenter())
    }
}

#[async_trait]
impl Registry for ConsulCatalogRegistry {
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Services, ProviderError> {
        debug!(tag = %self.tag, "Fetching services from consul catalog");
        let filter = format!("{} in ServiceTags", quote(&self.tag));
        let names: HashMap<String, Vec<String>> = self
            .client
            .get_json(cancel, &["v1", "catalog", "services"], &[("filter", filter.as_str())])
            .await?;

        let mut names: Vec<String> = names.into_keys().collect();
        names.sort();

        let mut services = Services::new();
        for name in names {
            let items: Vec<CatalogService> = self
                .client
                .get_json(
                    cancel,
                    &["v1", "catalog", "service", name.as_str()],
                    &[("tag", self.tag.as_str())],
                )
                .await?;
            for item in items {
                services.push(Service::from(item));
            }
        }
        Ok(services)
    }

    async fn register(
        &self,
        cancel: &CancellationToken,
        service: &Service,
    ) -> Result<(), ProviderError> {
        let node = service.node.as_ref().ok_or(ValidationError::MissingNode)?;

        let registration = CatalogRegistration {
            node: &node.node,
            address: &node.address,
            datacenter: self.datacenter(node),
            node_meta: &node.metadata,
            service: CatalogServiceRegistration {
                id: service.id.as_deref(),
                service: &service.name,
                tags: merge_tags(&self.tag, service),
                address: &service.address,
                port: service.port,
                meta: &service.metadata,
                enable_tag_override: true,
            },
        };
        self.client
            .put_json(cancel, &["v1", "catalog", "register"], &registration)
            .await?;

        info!(
            identity = %service.identity(),
            node = %node.node,
            "Service registered in consul catalog"
        );
        Ok(())
    }

    async fn deregister(
        &self,
        cancel: &CancellationToken,
        service: &Service,
    ) -> Result<(), ProviderError> {
        let node = service.node.as_ref().ok_or_else(|| {
            ProviderError::backend(format!(
                "service \"{}\" has no node, catalog deregistration requires one",
                service.identity()
            ))
        })?;

        let deregistration = CatalogDeregistration {
            node: &node.node,
            service_id: service.identity(),
            datacenter: self.datacenter(node),
        };
        self.client
            .put_json(cancel, &["v1", "catalog", "deregister"], &deregistration)
            .await?;

        info!(
            identity = %service.identity(),
            node = %node.node,
            "Service deregistered from consul catalog"
        );
        Ok(())
    }

    fn validate(&self, service: &Service) -> Result<(), ValidationError> {
        validate_with(service, &[&RequireNode])
    }
}
