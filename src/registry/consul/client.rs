//! Consul HTTP API 客户端

use super::{DEFAULT_ADDRESS, OPTION_ADDRESS, OPTION_DATACENTER, OPTION_TIMEOUT, OPTION_TOKEN};
use crate::error::ProviderError;
use crate::provider::ProviderOptions;
use reqwest::{Client as HttpClient, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Consul 客户端配置
#[derive(Debug, Clone)]
pub struct ConsulClientConfig {
    /// HTTP API 地址，缺少 scheme 时补全为 http
    pub address: String,
    /// ACL token（`X-Consul-Token`）
    pub token: Option<String>,
    /// 数据中心（`dc` 查询参数）
    pub datacenter: Option<String>,
    /// 单次请求超时
    pub timeout: Option<Duration>,
}

impl Default for ConsulClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            token: None,
            datacenter: None,
            timeout: None,
        }
    }
}

impl ConsulClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// 从 Provider 配置读取
    pub fn from_options(options: &ProviderOptions) -> Result<Self, ProviderError> {
        Ok(Self {
            address: options.require_str(OPTION_ADDRESS)?,
            token: options.get_str(OPTION_TOKEN),
            datacenter: options.get_str(OPTION_DATACENTER),
            timeout: options.get_duration(OPTION_TIMEOUT)?,
        })
    }
}

/// Consul 客户端
///
/// 所有请求都会与取消令牌竞争，令牌触发时立即返回 `ProviderError::Cancelled`。
/// 请求路径以分段形式传入，每段单独做百分号编码，
/// 服务 ID 中的 `/`、`?`、`#` 不会改变请求目标。
#[derive(Debug, Clone)]
pub struct ConsulClient {
    http_client: HttpClient,
    base_url: String,
    endpoint: Url,
    token: Option<String>,
    datacenter: Option<String>,
}

impl ConsulClient {
    /// 创建新的 Consul 客户端
    pub fn new(config: ConsulClientConfig) -> Result<Self, ProviderError> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ProviderError::backend(format!("failed to create consul client: {}", e)))?;

        let base_url = normalize_address(&config.address);
        let endpoint = Url::parse(&base_url)
            .map_err(|e| ProviderError::invalid_option(OPTION_ADDRESS, e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            endpoint,
            token: config.token,
            datacenter: config.datacenter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn datacenter(&self) -> Option<&str> {
        self.datacenter.as_deref()
    }

    /// GET 请求并解析 JSON 响应
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = self.url(segments)?;
        let request = self.http_client.get(url.clone()).query(query);
        let body = self.execute(cancel, request, url.as_str()).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// PUT 请求（JSON 请求体）
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        cancel: &CancellationToken,
        segments: &[&str],
        body: &B,
    ) -> Result<(), ProviderError> {
        let url = self.url(segments)?;
        let request = self.http_client.put(url.clone()).json(body);
        self.execute(cancel, request, url.as_str()).await.map(|_| ())
    }

    /// PUT 请求（无请求体）
    pub async fn put(
        &self,
        cancel: &CancellationToken,
        segments: &[&str],
    ) -> Result<(), ProviderError> {
        let url = self.url(segments)?;
        let request = self.http_client.put(url.clone());
        self.execute(cancel, request, url.as_str()).await.map(|_| ())
    }

    /// 拼接请求地址，每个分段单独编码
    ///
    /// `.` 与 `..` 会被 URL 规范化吞掉，无法作为分段寻址，直接拒绝。
    pub fn url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        if let Some(segment) = segments.iter().find(|s| matches!(**s, "." | "..")) {
            return Err(ProviderError::backend(format!(
                "path segment \"{}\" cannot be addressed",
                segment
            )));
        }

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::backend(format!("invalid consul address: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// 发送请求，非 2xx 响应转换为 `ProviderError::Status`
    async fn execute(
        &self,
        cancel: &CancellationToken,
        mut request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<String, ProviderError> {
        if let Some(token) = &self.token {
            request = request.header("X-Consul-Token", token);
        }
        if let Some(dc) = &self.datacenter {
            request = request.query(&[("dc", dc)]);
        }

        let send = async {
            let response = request.send().await.map_err(|source| ProviderError::Http {
                url: url.to_string(),
                source,
            })?;
            let status = response.status();
            let body = response.text().await.map_err(|source| ProviderError::Http {
                url: url.to_string(),
                source,
            })?;

            if !status.is_success() {
                return Err(ProviderError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                    body: body.trim().to_string(),
                });
            }
            Ok(body)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            result = send => result,
        }
    }
}

/// 去掉结尾的 `/`，缺少 scheme 时补全为 http
fn normalize_address(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}
