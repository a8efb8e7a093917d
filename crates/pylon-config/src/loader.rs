use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::PylonConfig;

/// Loads the Pylon configuration and keeps a shared snapshot of it.
pub struct ConfigLoader {
    config: Arc<RwLock<PylonConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > PYLON_CONFIG env > ~/.pylon/pylon.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("PYLON_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pylon")
            .join("pylon.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> pylon_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            Self::read(&config_path)?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            PylonConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(pylon_core::PylonError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> PylonConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for subscription.
    pub fn shared(&self) -> Arc<RwLock<PylonConfig>> {
        Arc::clone(&self.config)
    }

    /// Path the config was loaded from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn read(path: &Path) -> pylon_core::Result<PylonConfig> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str::<PylonConfig>(&raw).map_err(|e| {
            pylon_core::PylonError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply env var overrides (PYLON_ENV, PYLON_PLUGINS_PATH, etc.)
    fn apply_env_overrides(mut config: PylonConfig) -> PylonConfig {
        if let Ok(v) = std::env::var("PYLON_ENV") {
            match v.parse() {
                Ok(env) => config.env = env,
                Err(e) => warn!(error = %e, "ignoring PYLON_ENV"),
            }
        }
        if let Ok(v) = std::env::var("PYLON_PLUGINS_PATH") {
            config.paths.plugins = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PYLON_STATIC_ROOT") {
            config.paths.static_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PYLON_LOG_LEVEL") {
            config.logging.level = v;
        }
        config
    }

    /// Reload the config from disk. A file that fails to parse or validate
    /// leaves the current snapshot untouched.
    pub fn reload(&self) -> pylon_core::Result<()> {
        if !self.config_path.exists() {
            return Err(pylon_core::PylonError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let new_config = Self::apply_env_overrides(Self::read(&self.config_path)?);
        new_config.validate().map_err(pylon_core::PylonError::Config)?;
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }
}
