//! Provider 目录
//!
//! 在进程启动时显式构建的"名称 → 工厂"映射，取代全局注册表。
//! 注册顺序即命令行子命令顺序，可确定、可测试。

pub mod options;

pub use options::{OptionSpec, ProviderOptions};

use crate::error::{AggregateError, ProviderError};
use crate::registry::Registry;
use crate::registry::consul::{ConsulAgentRegistry, ConsulCatalogRegistry};
use crate::source::{FileSource, Source};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Provider 工厂
pub type Factory<T> = Arc<dyn Fn(&ProviderOptions) -> Result<Arc<T>, ProviderError> + Send + Sync>;

/// Source Provider
pub type SourceProvider = Provider<dyn Source>;

/// Registry Provider
pub type RegistryProvider = Provider<dyn Registry>;

/// Provider 类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Source,
    Registry,
}

impl ProviderKind {
    /// 命令行参数前缀
    pub fn prefix(&self) -> &'static str {
        match self {
            ProviderKind::Source => "source",
            ProviderKind::Registry => "registry",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// 目录错误
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{kind} provider with name \"{name}\" has been already registered")]
    Duplicate { kind: ProviderKind, name: String },

    #[error("{kind} provider with name \"{name}\" was not registered")]
    NotRegistered { kind: ProviderKind, name: String },

    #[error("{kind} \"{name}\" options validation error: {source}")]
    InvalidOptions {
        kind: ProviderKind,
        name: String,
        #[source]
        source: AggregateError,
    },
}

/// 命名的 Source / Registry 工厂及其配置项
pub struct Provider<T: ?Sized> {
    name: String,
    description: String,
    options: Vec<OptionSpec>,
    factory: Factory<T>,
}

impl<T: ?Sized> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized> Provider<T> {
    /// 创建新的 Provider
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        options: Vec<OptionSpec>,
        factory: F,
    ) -> Self
    where
        F: Fn(&ProviderOptions) -> Result<Arc<T>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            options,
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    /// 填充默认值后调用工厂
    pub fn build(&self, options: &ProviderOptions) -> Result<Arc<T>, ProviderError> {
        let options = options.clone().with_defaults(&self.options);
        (self.factory)(&options)
    }

    /// 校验配置项声明，收集全部问题
    fn check_options(&self) -> Result<(), AggregateError> {
        let mut errors = AggregateError::new();
        let mut seen = HashSet::new();
        for spec in &self.options {
            if !is_kebab_case(&spec.key) {
                errors.add(format!(
                    "option \"{}\" must be non-empty lowercase kebab-case",
                    spec.key
                ));
            }
            if !seen.insert(spec.key.as_str()) {
                errors.add(format!("option \"{}\" is declared more than once", spec.key));
            }
        }
        errors.into_result()
    }
}

/// Provider 目录
#[derive(Debug, Clone, Default)]
pub struct ProviderCatalog {
    sources: Vec<SourceProvider>,
    registries: Vec<RegistryProvider>,
}

impl ProviderCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册所有内置 Provider
    pub fn builtin() -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        catalog.register_source(FileSource::provider())?;
        catalog.register_registry(ConsulAgentRegistry::provider())?;
        catalog.register_registry(ConsulCatalogRegistry::provider())?;
        Ok(catalog)
    }

    /// 注册 Source Provider
    pub fn register_source(&mut self, provider: SourceProvider) -> Result<(), CatalogError> {
        Self::register(&mut self.sources, ProviderKind::Source, provider)
    }

    /// 注册 Registry Provider
    pub fn register_registry(&mut self, provider: RegistryProvider) -> Result<(), CatalogError> {
        Self::register(&mut self.registries, ProviderKind::Registry, provider)
    }

    /// 按名称查找 Source Provider
    pub fn lookup_source(&self, name: &str) -> Result<&SourceProvider, CatalogError> {
        Self::lookup(&self.sources, ProviderKind::Source, name)
    }

    /// 按名称查找 Registry Provider
    pub fn lookup_registry(&self, name: &str) -> Result<&RegistryProvider, CatalogError> {
        Self::lookup(&self.registries, ProviderKind::Registry, name)
    }

    /// 按注册顺序列出 Source Provider
    pub fn sources(&self) -> &[SourceProvider] {
        &self.sources
    }

    /// 按注册顺序列出 Registry Provider
    pub fn registries(&self) -> &[RegistryProvider] {
        &self.registries
    }

    fn register<T: ?Sized>(
        list: &mut Vec<Provider<T>>,
        kind: ProviderKind,
        provider: Provider<T>,
    ) -> Result<(), CatalogError> {
        if list.iter().any(|p| p.name == provider.name) {
            return Err(CatalogError::Duplicate {
                kind,
                name: provider.name,
            });
        }
        if let Err(source) = provider.check_options() {
            return Err(CatalogError::InvalidOptions {
                kind,
                name: provider.name,
                source,
            });
        }
        debug!(kind = %kind, name = %provider.name, "Provider registered");
        list.push(provider);
        Ok(())
    }

    fn lookup<'a, T: ?Sized>(
        list: &'a [Provider<T>],
        kind: ProviderKind,
        name: &str,
    ) -> Result<&'a Provider<T>, CatalogError> {
        list.iter()
            .find(|p| p.name == name)
            .ok_or_else(|| CatalogError::NotRegistered {
                kind,
                name: name.to_string(),
            })
    }
}

fn is_kebab_case(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('-')
        && !key.ends_with('-')
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
