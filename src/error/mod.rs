//! 同步错误处理模块
//!
//! 区分三层错误：
//! - `ProviderError`：Source / Registry 实现在单次调用中返回的错误
//! - `ApplyError`：单个服务注册/注销失败（带服务标识）
//! - `SyncError`：一次完整对账周期的最终结果

pub mod aggregate;
pub mod conversions;

pub use aggregate::AggregateError;
pub use crate::service::validation::ValidationError;

use thiserror::Error;

/// 动态错误类型（与运行时任务结果保持一致）
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, SyncError>;

/// Source / Registry 实现返回的错误
#[derive(Error, Debug)]
pub enum ProviderError {
    /// 调用被取消（取消令牌已触发）
    #[error("operation cancelled")]
    Cancelled,

    /// 注册前校验失败
    #[error("service has validation error before registration: {0}")]
    Validation(#[from] ValidationError),

    /// 读取失败
    #[error("failed read content from config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 反序列化失败
    #[error("failed decode content from config file {path}: {reason}")]
    Decode { path: String, reason: String },

    /// HTTP 请求失败
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 后端返回非成功状态码
    #[error("unexpected status {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Provider 配置项非法
    #[error("invalid option \"{key}\": {reason}")]
    InvalidOption { key: String, reason: String },

    /// 其他后端错误
    #[error("{0}")]
    Backend(String),
}

impl ProviderError {
    /// 创建后端错误
    pub fn backend(msg: impl Into<String>) -> Self {
        ProviderError::Backend(msg.into())
    }

    /// 创建配置项错误
    pub fn invalid_option(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ProviderError::InvalidOption {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// 是否为取消错误
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Cancelled)
    }

    /// 后端返回 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Status { status: 404, .. })
    }
}

/// 单个服务的注册/注销失败
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("failed to deregister service \"{identity}\" from registry: {source}")]
    Deregister {
        identity: String,
        #[source]
        source: ProviderError,
    },

    #[error("failed to register service \"{identity}\" in registry: {source}")]
    Register {
        identity: String,
        #[source]
        source: ProviderError,
    },
}

impl ApplyError {
    /// 失败服务的标识
    pub fn identity(&self) -> &str {
        match self {
            ApplyError::Deregister { identity, .. } | ApplyError::Register { identity, .. } => {
                identity
            }
        }
    }

    /// 底层 Provider 错误
    pub fn provider_error(&self) -> &ProviderError {
        match self {
            ApplyError::Deregister { source, .. } | ApplyError::Register { source, .. } => source,
        }
    }
}

/// 对账周期错误
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("failed to fetch services from source: {0}")]
    SourceFetch(#[source] ProviderError),

    #[error("failed to fetch services from registry: {0}")]
    RegistryFetch(#[source] ProviderError),

    #[error("failed to deregister services: {0}")]
    Deregister(#[source] AggregateError),

    #[error("failed to register services: {0}")]
    Register(#[source] AggregateError),

    /// 周期执行过程中取消令牌被触发
    #[error("reconciliation cancelled")]
    Cancelled,
}

impl SyncError {
    /// 是否由取消导致
    pub fn is_cancelled(&self) -> bool {
        match self {
            SyncError::Cancelled => true,
            SyncError::SourceFetch(err) | SyncError::RegistryFetch(err) => err.is_cancelled(),
            SyncError::Deregister(_) | SyncError::Register(_) => false,
        }
    }

    /// 聚合的单服务错误（仅 Deregister / Register 变体）
    pub fn aggregate(&self) -> Option<&AggregateError> {
        match self {
            SyncError::Deregister(agg) | SyncError::Register(agg) => Some(agg),
            _ => None,
        }
    }
}
