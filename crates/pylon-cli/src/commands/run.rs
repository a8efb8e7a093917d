use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use pylon_config::PylonConfig;
use pylon_core::PylonError;
use pylon_plugin::{HttpVersionSource, UpdateChecker};

use super::plugins::discover;

pub(super) async fn cmd_run(config: PylonConfig) -> pylon_core::Result<()> {
    let updates = config.updates.clone();
    let (manager, _) = discover(config)?;
    let registry = manager.registry();
    info!(
        plugins = registry.len(),
        routes = registry.static_routes().len(),
        "plugin host ready"
    );

    let cancel = CancellationToken::new();
    let checker_task = match updates.check_url {
        Some(url) => {
            let current = semver::Version::parse(env!("CARGO_PKG_VERSION"))
                .map_err(|e| PylonError::UpdateCheck(e.to_string()))?;
            let checker = Arc::new(UpdateChecker::new(
                current,
                Box::new(HttpVersionSource::new(url)?),
                Duration::from_secs(updates.interval_secs),
            ));
            let token = cancel.clone();
            Some(tokio::spawn(async move { checker.run(token).await }))
        }
        None => {
            info!("no update check URL configured");
            None
        }
    };

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    cancel.cancel();

    if let Some(task) = checker_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "update checker stopped with an error"),
            Err(e) => error!(error = %e, "update checker task panicked"),
        }
    }
    Ok(())
}
