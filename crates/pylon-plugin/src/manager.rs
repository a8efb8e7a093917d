//! Plugin discovery orchestration.
//!
//! [`PluginManager`] owns the registries for the lifetime of the host. It
//! scans every configured root in a fixed order during startup and publishes
//! the result as a shared, read-only [`PluginRegistry`] snapshot.

use pylon_config::PylonConfig;
use pylon_core::{PylonError, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::ancestry::resolve_roots;
use crate::kinds::DataSourcePlugin;
use crate::registrar::Registrar;
use crate::registry::PluginRegistry;
use crate::scanner::{ScanRoot, Scanner};
use crate::signature::SignatureVerifier;
use crate::trust::{
    PluginError, PluginErrorCode, RootTrust, TrustDecision, TrustValidator, UnsignedCondition,
    UnsignedPolicy,
};

/// Summary of a single root scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub label: String,
    pub dir: PathBuf,
    pub discovered: usize,
    pub registered: Vec<String>,
    pub rejected: Vec<PluginError>,
    /// Parse and registration faults recorded during this scan.
    pub faults: usize,
}

pub struct PluginManager {
    config: PylonConfig,
    verifier: SignatureVerifier,
    policy: UnsignedPolicy,
    registry: Arc<PluginRegistry>,
    plugin_errors: BTreeMap<String, PluginErrorCode>,
    load_errors: Vec<PylonError>,
}

impl PluginManager {
    /// Build a manager from configuration. Configured paths are made
    /// absolute. Fails if a trusted key is unusable.
    pub fn new(mut config: PylonConfig) -> Result<Self> {
        config.paths = config.paths.resolve()?;
        let verifier = SignatureVerifier::from_trusted_keys(&config.plugins.trusted_keys)?;
        let policy = UnsignedPolicy::new(
            config.env.is_development(),
            config.plugins.allow_unsigned.iter().cloned(),
        );
        Ok(Self {
            config,
            verifier,
            policy,
            registry: Arc::new(PluginRegistry::new()),
            plugin_errors: BTreeMap::new(),
            load_errors: Vec::new(),
        })
    }

    /// Replace the signature verifier.
    pub fn with_verifier(mut self, verifier: SignatureVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Install a predicate that alone decides whether unsigned backend
    /// plugins may load under signing enforcement.
    pub fn with_unsigned_condition(mut self, condition: UnsignedCondition) -> Self {
        self.policy = self.policy.with_condition(condition);
        self
    }

    pub fn config(&self) -> &PylonConfig {
        &self.config
    }

    /// Run every startup scan: core, bundled, external, then per-plugin paths.
    pub fn init(&mut self) -> Result<Vec<ScanReport>> {
        info!("Starting plugin search");
        let paths = self.config.paths.clone();
        let mut reports = Vec::new();

        let core = ScanRoot::core(paths.core_plugins_dir());
        debug!(dir = %core.path.display(), "scanning core plugin directory");
        reports.push(self.scan(&core)?);

        if paths.bundled_plugins.try_exists()? {
            let bundled = ScanRoot::bundled(&paths.bundled_plugins);
            debug!(dir = %bundled.path.display(), "scanning bundled plugins directory");
            reports.push(self.scan(&bundled)?);
        }

        if !paths.plugins.try_exists()? {
            match std::fs::create_dir_all(&paths.plugins) {
                Ok(()) => info!(dir = %paths.plugins.display(), "external plugins directory created"),
                Err(e) => error!(dir = %paths.plugins.display(), error = %e, "failed to create external plugins directory"),
            }
        } else {
            let external = ScanRoot::external(&paths.plugins);
            debug!(dir = %external.path.display(), "scanning external plugins directory");
            reports.push(self.scan(&external)?);
        }

        for (plugin_id, path) in self.config.plugin_paths() {
            let root = ScanRoot::configured(&plugin_id, path);
            reports.push(self.scan(&root)?);
        }

        Arc::make_mut(&mut self.registry).link_app_includes();

        info!(
            plugins = self.registry.len(),
            rejected = self.plugin_errors.len(),
            faults = self.load_errors.len(),
            "plugin discovery complete"
        );
        Ok(reports)
    }

    /// Scan one root and register what it accepts.
    ///
    /// A fatal fault aborts the scan, wrapped in [`PylonError::ScanFailed`];
    /// plugins registered before it stay registered.
    pub fn scan(&mut self, root: &ScanRoot) -> Result<ScanReport> {
        self.scan_root(root).map_err(|e| PylonError::ScanFailed {
            label: root.label.clone(),
            dir: root.path.clone(),
            source: Box::new(e),
        })
    }

    fn scan_root(&mut self, root: &ScanRoot) -> Result<ScanReport> {
        let mut outcome = Scanner::new(root, &self.verifier).scan()?;
        resolve_roots(&mut outcome.plugins);
        debug!(dir = %root.path.display(), "initial plugin loading done");

        let mut report = ScanReport {
            label: root.label.clone(),
            dir: root.path.clone(),
            discovered: outcome.plugins.len(),
            faults: outcome.errors.len(),
            ..Default::default()
        };
        self.load_errors.append(&mut outcome.errors);

        // Roots never have a root of their own, so their status is final.
        let root_trust: HashMap<PathBuf, RootTrust> = outcome
            .plugins
            .iter()
            .filter(|(_, p)| p.root.is_none())
            .map(|(dir, p)| (dir.clone(), RootTrust::of(p)))
            .collect();

        let validator = TrustValidator::new(&self.policy, root.require_signing);
        let registry = Arc::make_mut(&mut self.registry);
        let mut registrar = Registrar::new(registry, &self.config.paths.static_root);

        for plugin in outcome.plugins.values_mut() {
            let parent = plugin.root.as_ref().and_then(|dir| root_trust.get(dir));
            debug!(
                id = %plugin.id,
                signature = %plugin.signature,
                has_root = parent.is_some(),
                "found plugin"
            );

            match validator.validate(plugin, parent)? {
                TrustDecision::Accept => {}
                TrustDecision::Reject(code) => {
                    debug!(id = %plugin.id, status = %code, "failed to validate plugin signature, will skip loading");
                    self.plugin_errors.insert(plugin.id.clone(), code);
                    report.rejected.push(PluginError {
                        plugin_id: plugin.id.clone(),
                        error_code: code,
                    });
                    continue;
                }
            }

            match registrar.register(plugin)? {
                None => report.registered.push(plugin.id.clone()),
                Some(fault) => {
                    report.faults += 1;
                    self.load_errors.push(fault);
                }
            }
        }

        if report.faults > 0 {
            warn!(
                dir = %root.path.display(),
                faults = report.faults,
                "some plugins failed to load"
            );
        }

        Ok(report)
    }

    /// Shared snapshot of the registries.
    pub fn registry(&self) -> Arc<PluginRegistry> {
        Arc::clone(&self.registry)
    }

    /// Plugins rejected by trust validation, in id order.
    pub fn scanning_errors(&self) -> Vec<PluginError> {
        self.plugin_errors
            .iter()
            .map(|(id, code)| PluginError {
                plugin_id: id.clone(),
                error_code: *code,
            })
            .collect()
    }

    /// Parse and registration faults from every scan so far.
    pub fn load_errors(&self) -> &[PylonError] {
        &self.load_errors
    }

    pub fn get_datasource(&self, id: &str) -> Option<&DataSourcePlugin> {
        self.registry.get_datasource(id)
    }

    pub fn is_app_installed(&self, id: &str) -> bool {
        self.registry.is_app_installed(id)
    }

    /// Read `<NAME>.md` (falling back to `<name>.md`) from a plugin's
    /// directory. Empty when neither exists.
    pub fn get_plugin_markdown(&self, plugin_id: &str, name: &str) -> Result<Vec<u8>> {
        let plugin = self
            .registry
            .get_plugin(plugin_id)
            .ok_or_else(|| PylonError::PluginNotFound(plugin_id.to_string()))?;

        let upper = plugin.directory.join(format!("{}.md", name.to_uppercase()));
        let lower = plugin.directory.join(format!("{}.md", name.to_lowercase()));
        for path in [upper, lower] {
            if path.try_exists()? {
                return Ok(std::fs::read(&path)?);
            }
        }
        Ok(Vec::new())
    }
}
