//! flare-sync - keeps a service registry consistent with a declared list of services
//!
//! `once` exits with a non-zero status when the reconciliation fails,
//! `watch` runs until Ctrl+C / SIGTERM.

use anyhow::Result;
use flare_registry_sync::logging;
use flare_registry_sync::provider::ProviderCatalog;
use flare_registry_sync::runtime::SyncRuntime;
use flare_sync_cli::cli;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let catalog = ProviderCatalog::builtin()?;
    let matches = cli::build(&catalog).get_matches();
    let (config, mode) = cli::resolve(&catalog, &matches)?;

    logging::init(&config.logging)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        source = %config.source.kind,
        registry = %config.registry.kind,
        mode = ?mode,
        "Starting flare-sync"
    );

    SyncRuntime::build(&config, &catalog)?
        .run_until_signal(mode)
        .await
}
