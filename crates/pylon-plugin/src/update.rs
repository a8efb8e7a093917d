//! Periodic check for a newer host version.
//!
//! The checker only writes its own status fields and never touches the
//! plugin registries.

use async_trait::async_trait;
use parking_lot::RwLock;
use pylon_core::{PylonError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where the latest published version comes from.
#[async_trait]
pub trait VersionSource: Send + Sync {
    async fn latest_version(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// Fetches `{"version": "x.y.z"}` from a URL.
pub struct HttpVersionSource {
    client: reqwest::Client,
    url: String,
}

impl HttpVersionSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pylon/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PylonError::UpdateCheck(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl VersionSource for HttpVersionSource {
    async fn latest_version(&self) -> Result<String> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PylonError::UpdateCheck(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(PylonError::UpdateCheck(format!(
                "{} returned {}",
                self.url,
                resp.status()
            )));
        }

        let body: VersionResponse = resp
            .json()
            .await
            .map_err(|e| PylonError::UpdateCheck(e.to_string()))?;
        Ok(body.version)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub latest_version: Option<String>,
    pub has_update: bool,
}

/// Shortest interval between two update checks.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

pub struct UpdateChecker {
    current: semver::Version,
    source: Box<dyn VersionSource>,
    interval: Duration,
    status: RwLock<UpdateStatus>,
}

impl UpdateChecker {
    /// An `interval` shorter than [`MIN_CHECK_INTERVAL`] is raised to it.
    pub fn new(current: semver::Version, source: Box<dyn VersionSource>, interval: Duration) -> Self {
        if interval < MIN_CHECK_INTERVAL {
            warn!(?interval, "update check interval too short, using {:?}", MIN_CHECK_INTERVAL);
        }
        Self {
            current,
            source,
            interval: interval.max(MIN_CHECK_INTERVAL),
            status: RwLock::new(UpdateStatus::default()),
        }
    }

    pub fn status(&self) -> UpdateStatus {
        self.status.read().clone()
    }

    /// Fetch the latest version once and update the status.
    pub async fn check(&self) -> Result<()> {
        let raw = self.source.latest_version().await?;
        let latest = semver::Version::parse(raw.trim().trim_start_matches('v'))
            .map_err(|e| PylonError::UpdateCheck(format!("invalid version '{raw}': {e}")))?;

        let has_update = latest > self.current;
        if has_update {
            info!(current = %self.current, latest = %latest, "a newer version is available");
        } else {
            debug!(current = %self.current, latest = %latest, "running the latest version");
        }

        *self.status.write() = UpdateStatus {
            latest_version: Some(latest.to_string()),
            has_update,
        };
        Ok(())
    }

    /// Check now, then once per interval, until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.check() => {
                    if let Err(e) = result {
                        warn!(error = %e, "update check failed");
                    }
                }
            }
        }
        debug!("update checker stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FixedSource {
        versions: Mutex<Vec<Result<String>>>,
    }

    #[async_trait]
    impl VersionSource for FixedSource {
        async fn latest_version(&self) -> Result<String> {
            self.versions
                .lock()
                .pop()
                .unwrap_or_else(|| Ok("1.0.0".to_string()))
        }
    }

    fn checker(versions: Vec<Result<String>>) -> UpdateChecker {
        UpdateChecker::new(
            semver::Version::new(1, 0, 0),
            Box::new(FixedSource {
                versions: Mutex::new(versions),
            }),
            Duration::from_secs(600),
        )
    }

    #[tokio::test]
    async fn newer_version_sets_has_update() {
        let c = checker(vec![Ok("v1.2.0".into())]);
        c.check().await.unwrap();
        assert_eq!(
            c.status(),
            UpdateStatus {
                latest_version: Some("1.2.0".into()),
                has_update: true,
            }
        );
    }

    #[tokio::test]
    async fn same_version_is_not_an_update() {
        let c = checker(vec![Ok("1.0.0".into())]);
        c.check().await.unwrap();
        assert!(!c.status().has_update);
    }

    #[tokio::test]
    async fn failed_check_keeps_previous_status() {
        let c = checker(vec![
            Err(PylonError::UpdateCheck("offline".into())),
            Ok("2.0.0".into()),
        ]);
        c.check().await.unwrap();
        assert!(c.check().await.is_err());
        assert_eq!(c.status().latest_version.as_deref(), Some("2.0.0"));
    }

    #[tokio::test]
    async fn zero_interval_is_clamped() {
        let c = UpdateChecker::new(
            semver::Version::new(1, 0, 0),
            Box::new(FixedSource {
                versions: Mutex::new(vec![Ok("1.1.0".into())]),
            }),
            Duration::ZERO,
        );
        assert_eq!(c.interval, MIN_CHECK_INTERVAL);

        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stop.cancel();
        });
        c.run(cancel).await.unwrap();
        assert!(c.status().has_update);
    }

    #[tokio::test]
    async fn invalid_version_is_an_error() {
        let c = checker(vec![Ok("latest".into())]);
        assert!(matches!(c.check().await, Err(PylonError::UpdateCheck(_))));
        assert_eq!(c.status(), UpdateStatus::default());
    }
}
