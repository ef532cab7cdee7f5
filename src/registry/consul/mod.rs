//! Consul 服务注册中心
//!
//! 提供两种注册方式：
//! - **agent**：通过本地 agent 注册（`/v1/agent/service/*`）
//! - **catalog**：按节点直接写入 catalog（`/v1/catalog/*`），服务必须携带节点信息
//!
//! 两者都使用公共标签限定管理范围：fetch 只返回带该标签的服务，
//! register 时把标签合并进服务标签。

pub mod agent;
pub mod catalog;
pub mod client;

pub use agent::ConsulAgentRegistry;
pub use catalog::ConsulCatalogRegistry;
pub use client::{ConsulClient, ConsulClientConfig};

use crate::error::ProviderError;
use crate::provider::{OptionSpec, ProviderOptions};
use crate::service::Service;

/// 默认 Consul 地址
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8500";

/// 默认公共标签
pub const DEFAULT_TAG: &str = "flare-sync";

pub(crate) const OPTION_ADDRESS: &str = "address";
pub(crate) const OPTION_TOKEN: &str = "token";
pub(crate) const OPTION_DATACENTER: &str = "datacenter";
pub(crate) const OPTION_TIMEOUT: &str = "timeout";
pub(crate) const OPTION_TAG: &str = "tag";

/// 两种 Consul 注册中心共用的配置项
pub(crate) fn option_specs() -> Vec<OptionSpec> {
    vec![
        OptionSpec::new(OPTION_ADDRESS, "Consul HTTP API address").with_default(DEFAULT_ADDRESS),
        OptionSpec::new(OPTION_TOKEN, "Consul ACL token"),
        OptionSpec::new(OPTION_DATACENTER, "Consul datacenter"),
        OptionSpec::new(OPTION_TIMEOUT, "HTTP request timeout (e.g. 5s)"),
        OptionSpec::new(OPTION_TAG, "Common tag marking services managed by this process")
            .with_default(DEFAULT_TAG),
    ]
}

/// 读取公共标签
pub(crate) fn tag_from_options(options: &ProviderOptions) -> Result<String, ProviderError> {
    options.require_str(OPTION_TAG)
}

/// 合并公共标签与服务标签，公共标签在前且不重复
pub(crate) fn merge_tags(tag: &str, service: &Service) -> Vec<String> {
    std::iter::once(tag.to_string())
        .chain(service.tags.iter().filter(|t| t.as_str() != tag).cloned())
        .collect()
}

/// Consul 过滤表达式中的字符串转义
pub(crate) fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
