use base64::Engine;
use pylon_core::Environment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Root configuration, maps to `pylon.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PylonConfig {
    /// Runtime environment. `development` allows unsigned plugins.
    pub env: Environment,
    pub paths: PathsConfig,
    pub plugins: PluginsConfig,
    /// Per-plugin settings keyed by plugin id. A `path` entry adds an
    /// individually configured scan root.
    pub plugin_settings: BTreeMap<String, HashMap<String, String>>,
    pub updates: UpdatesConfig,
    pub logging: LoggingConfig,
}

// ── Paths ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the static frontend assets. Core plugins live in
    /// `<static_root>/app/plugins`.
    pub static_root: PathBuf,
    /// Plugins shipped alongside the host binary.
    pub bundled_plugins: PathBuf,
    /// External (user-installed) plugin directory.
    pub plugins: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            static_root: PathBuf::from("public"),
            bundled_plugins: PathBuf::from("plugins-bundled"),
            plugins: PathBuf::from("data/plugins"),
        }
    }
}

impl PathsConfig {
    /// Directory holding the core plugins.
    pub fn core_plugins_dir(&self) -> PathBuf {
        self.static_root.join("app").join("plugins")
    }

    /// The same paths made absolute against the current directory.
    pub fn resolve(&self) -> std::io::Result<Self> {
        Ok(Self {
            static_root: std::path::absolute(&self.static_root)?,
            bundled_plugins: std::path::absolute(&self.bundled_plugins)?,
            plugins: std::path::absolute(&self.plugins)?,
        })
    }
}

// ── Plugins ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Plugin ids allowed to run unsigned under signing enforcement.
    pub allow_unsigned: Vec<String>,
    /// Public keys trusted to sign plugin manifests.
    pub trusted_keys: Vec<TrustedKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedKey {
    pub key_id: String,
    /// Base64-encoded Ed25519 public key.
    pub public_key: String,
}

impl TrustedKey {
    /// Decode the public key bytes.
    pub fn decode(&self) -> Result<Vec<u8>, String> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(self.public_key.trim())
            .map_err(|e| format!("key {} is not valid base64: {e}", self.key_id))?;
        if bytes.len() != 32 {
            return Err(format!(
                "key {} must be 32 bytes, got {}",
                self.key_id,
                bytes.len()
            ));
        }
        Ok(bytes)
    }
}

// ── Updates ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatesConfig {
    /// Endpoint returning `{"version": "x.y.z"}`. Unset disables polling.
    pub check_url: Option<String>,
    /// Seconds between checks.
    pub interval_secs: u64,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            check_url: None,
            interval_secs: 600,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl PylonConfig {
    /// Configured per-plugin scan paths, in plugin id order. Entries without
    /// a non-empty `path` are skipped.
    pub fn plugin_paths(&self) -> Vec<(String, PathBuf)> {
        self.plugin_settings
            .iter()
            .filter_map(|(id, settings)| {
                settings
                    .get("path")
                    .filter(|p| !p.is_empty())
                    .map(|p| (id.clone(), PathBuf::from(p)))
            })
            .collect()
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
            WarningSeverity::Info => "info",
        };
        write!(f, "[{}] {}: {}", label, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   hint: {}", h)?;
        }
        Ok(())
    }
}

impl PylonConfig {
    /// Validate the config and return a list of warnings.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Environment ───
        if self.env.is_development() {
            warnings.push(ConfigWarning {
                field: "env".into(),
                message: "development mode allows unsigned backend plugins".into(),
                severity: WarningSeverity::Info,
                hint: None,
            });
        }

        // ── Paths ───
        if self.paths.plugins.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                field: "paths.plugins".into(),
                message: "external plugin directory is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 'data/plugins'".into()),
            });
        }

        // ── Trusted keys ───
        for (i, key) in self.plugins.trusted_keys.iter().enumerate() {
            if key.key_id.trim().is_empty() {
                warnings.push(ConfigWarning {
                    field: format!("plugins.trusted_keys[{i}].key_id"),
                    message: "key id is empty".into(),
                    severity: WarningSeverity::Error,
                    hint: None,
                });
            }
            if let Err(e) = key.decode() {
                warnings.push(ConfigWarning {
                    field: format!("plugins.trusted_keys[{i}].public_key"),
                    message: e,
                    severity: WarningSeverity::Error,
                    hint: Some("Expected a base64-encoded 32-byte Ed25519 public key".into()),
                });
            }
        }
        if self.plugins.trusted_keys.is_empty() {
            warnings.push(ConfigWarning {
                field: "plugins.trusted_keys".into(),
                message: "no trusted signing keys; every signed plugin will be treated as invalid"
                    .into(),
                severity: WarningSeverity::Info,
                hint: None,
            });
        }

        // ── Allow-list ───
        if self.plugins.allow_unsigned.iter().any(|id| id.trim().is_empty()) {
            warnings.push(ConfigWarning {
                field: "plugins.allow_unsigned".into(),
                message: "allow-list contains an empty plugin id".into(),
                severity: WarningSeverity::Warning,
                hint: None,
            });
        }

        // ── Updates ───
        if self.updates.interval_secs == 0 {
            warnings.push(ConfigWarning {
                field: "updates.interval_secs".into(),
                message: "update check interval is 0".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 600 (ten minutes)".into()),
            });
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Error,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| w.to_string())
            .collect();
        if !errors.is_empty() {
            return Err(errors.join("\n"));
        }

        Ok(warnings)
    }
}
