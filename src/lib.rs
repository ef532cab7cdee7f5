//! Flare Registry Sync Library
//!
//! Keeps a service registry in line with a declared list of services. Each
//! reconciliation cycle fetches the desired services from a source, fetches
//! what the registry currently holds, deregisters orphans and (re)registers
//! everything declared.

pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod reconciler;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod source;

// 运行时（进程入口）
pub mod runtime;

// Re-exports
pub use config::{ConfigError, SyncConfig};
pub use error::{AggregateError, ApplyError, ProviderError, Result, SyncError, ValidationError};
pub use provider::{CatalogError, ProviderCatalog, ProviderOptions};
pub use reconciler::{ErrorPolicy, Reconcile, Reconciler, find_orphans};
pub use registry::Registry;
pub use scheduler::Scheduler;
pub use service::{Node, Service, Services};
pub use source::Source;

// 运行时 re-exports
pub use runtime::{RunMode, SyncRuntime};
