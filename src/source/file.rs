//! 文件服务来源
//!
//! 从 YAML / JSON / TOML 文件读取服务列表

use super::Source;
use crate::error::ProviderError;
use crate::provider::{OptionSpec, ProviderOptions, SourceProvider};
use crate::service::{Service, Services};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Provider 名称
pub const NAME: &str = "file";

const OPTION_PATH: &str = "path";
const OPTION_FORMAT: &str = "format";
const OPTION_STRICT: &str = "strict";

const DEFAULT_PATH: &str = "~/services.yml";

/// 文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// 按扩展名推断，未知扩展名按 YAML 解析
    #[default]
    Auto,
    Yaml,
    Json,
    Toml,
}

impl std::str::FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "" => Ok(FileFormat::Auto),
            "yaml" | "yml" => Ok(FileFormat::Yaml),
            "json" => Ok(FileFormat::Json),
            "toml" => Ok(FileFormat::Toml),
            _ => Err(format!("unknown file format: {}", s)),
        }
    }
}

impl FileFormat {
    /// 解析 Auto 为具体格式
    fn resolve(self, path: &Path) -> FileFormat {
        if self != FileFormat::Auto {
            return self;
        }
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("json") => FileFormat::Json,
            Some("toml") => FileFormat::Toml,
            _ => FileFormat::Yaml,
        }
    }
}

/// TOML 文件的顶层结构（TOML 不支持顶层数组）
#[derive(Deserialize)]
struct TomlDocument {
    #[serde(default)]
    services: Vec<Service>,
}

/// 文件服务来源
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: FileFormat,
    strict: bool,
}

impl FileSource {
    /// 创建新的文件来源
    ///
    /// 路径开头的 `~` 或 `$HOME` 会被展开
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: expand_home(path.as_ref()),
            format: FileFormat::Auto,
            strict: false,
        }
    }

    /// 设置文件格式
    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    /// 严格模式：任一服务校验失败则整个 fetch 失败
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 从 Provider 配置构建
    pub fn from_options(options: &ProviderOptions) -> Result<Self, ProviderError> {
        let path = options.require_str(OPTION_PATH)?;
        let format = match options.get_str(OPTION_FORMAT) {
            Some(raw) => raw
                .parse::<FileFormat>()
                .map_err(|e| ProviderError::invalid_option(OPTION_FORMAT, e))?,
            None => FileFormat::Auto,
        };
        let strict = options.get_bool(OPTION_STRICT)?.unwrap_or(false);

        Ok(Self::new(path).with_format(format).with_strict(strict))
    }

    /// Provider 描述（名称、配置项、工厂）
    pub fn provider() -> SourceProvider {
        SourceProvider::new(
            NAME,
            "Fetch services from a YAML, JSON or TOML file",
            vec![
                OptionSpec::new(OPTION_PATH, "Services file path").with_default(DEFAULT_PATH),
                OptionSpec::new(OPTION_FORMAT, "File format: auto, yaml, json or toml")
                    .with_default("auto"),
                OptionSpec::new(OPTION_STRICT, "Fail the fetch when any service is invalid")
                    .with_default("false"),
            ],
            |options| Ok(Arc::new(FileSource::from_options(options)?)),
        )
    }

    fn decode(&self, content: &str) -> Result<Vec<Service>, ProviderError> {
        let decode_err = |reason: String| ProviderError::Decode {
            path: self.path.display().to_string(),
            reason,
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match self.format.resolve(&self.path) {
            FileFormat::Json => {
                serde_json::from_str::<Vec<Service>>(content).map_err(|e| decode_err(e.to_string()))
            }
            FileFormat::Toml => toml::from_str::<TomlDocument>(content)
                .map(|doc| doc.services)
                .map_err(|e| decode_err(e.to_string())),
            FileFormat::Yaml | FileFormat::Auto => {
                serde_yaml::from_str::<Option<Vec<Service>>>(content)
                    .map(Option::unwrap_or_default)
                    .map_err(|e| decode_err(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Source for FileSource {
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Services, ProviderError> {
        debug!(path = %self.path.display(), "Reading services file");

        let content = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            result = tokio::fs::read_to_string(&self.path) => result.map_err(|source| ProviderError::Read {
                path: self.path.display().to_string(),
                source,
            })?,
        };

        let items = self.decode(&content)?;
        let total = items.len();

        let mut services = Services::new();
        for item in items {
            if let Err(e) = item.validate() {
                if self.strict {
                    return Err(ProviderError::Decode {
                        path: self.path.display().to_string(),
                        reason: format!("service \"{}\" is invalid: {}", item.identity(), e),
                    });
                }
                warn!(
                    identity = %item.identity(),
                    error = %e,
                    "Failed to validate service, skipping"
                );
                continue;
            }
            services.push(item);
        }

        info!(
            path = %self.path.display(),
            total = total,
            accepted = services.len(),
            "Services fetched from file"
        );
        Ok(services)
    }
}

/// 展开路径开头的 `~` / `$HOME`
fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" || path == "$HOME" {
        Some("")
    } else {
        path.strip_prefix("~/")
            .or_else(|| path.strip_prefix("$HOME/"))
    };

    match (rest, std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => {
            let home = PathBuf::from(home);
            if rest.is_empty() { home } else { home.join(rest) }
        }
        _ => PathBuf::from(path),
    }
}
