//! Per-organization plugin settings and the enabled-plugin query.

use async_trait::async_trait;
use pylon_core::{OrgId, PluginId, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::kinds::{AppPlugin, DataSourcePlugin, PanelPlugin};
use crate::registry::PluginRegistry;

/// Stored setting of one plugin for one organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSettingInfo {
    pub plugin_id: PluginId,
    pub org_id: OrgId,
    pub enabled: bool,
    pub pinned: bool,
}

/// Persisted plugin settings, keyed by organization.
#[async_trait]
pub trait PluginSettingsStore: Send + Sync {
    async fn plugin_settings(&self, org_id: OrgId) -> Result<Vec<PluginSettingInfo>>;
}

/// An in-memory settings store.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    settings: Vec<PluginSettingInfo>,
}

impl MemorySettingsStore {
    pub fn new(settings: Vec<PluginSettingInfo>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl PluginSettingsStore for MemorySettingsStore {
    async fn plugin_settings(&self, org_id: OrgId) -> Result<Vec<PluginSettingInfo>> {
        Ok(self
            .settings
            .iter()
            .filter(|s| s.org_id == org_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnabledPlugins {
    pub apps: Vec<AppPlugin>,
    pub data_sources: BTreeMap<String, DataSourcePlugin>,
    pub panels: Vec<PanelPlugin>,
}

/// Settings of every registered plugin for `org_id`, with defaults filled in
/// for plugins that have none stored.
///
/// Plugins default to enabled. Apps are enabled and pinned only when they
/// declare `autoEnabled`. A plugin included in an app follows the app's
/// stored setting and is disabled when the app has none.
pub async fn get_plugin_settings(
    registry: &PluginRegistry,
    store: &dyn PluginSettingsStore,
    org_id: OrgId,
) -> Result<BTreeMap<PluginId, PluginSettingInfo>> {
    let stored: BTreeMap<String, PluginSettingInfo> = store
        .plugin_settings(org_id)
        .await?
        .into_iter()
        .map(|s| (s.plugin_id.clone(), s))
        .collect();

    let mut settings = stored.clone();
    for plugin in registry.plugins() {
        if settings.contains_key(&plugin.id) {
            continue;
        }

        let mut opt = PluginSettingInfo {
            plugin_id: plugin.id.clone(),
            org_id,
            enabled: true,
            pinned: false,
        };

        if let Some(app) = registry.get_app(&plugin.id) {
            opt.enabled = app.auto_enabled;
            opt.pinned = app.auto_enabled;
        }

        if let Some(app_id) = &plugin.included_in_app_id {
            opt.enabled = stored.get(app_id).is_some_and(|app| app.enabled);
        }

        settings.insert(plugin.id.clone(), opt);
    }

    Ok(settings)
}

/// Apps, data sources and panels enabled for `org_id`.
pub async fn get_enabled_plugins(
    registry: &PluginRegistry,
    store: &dyn PluginSettingsStore,
    org_id: OrgId,
) -> Result<EnabledPlugins> {
    let settings = get_plugin_settings(registry, store, org_id).await?;
    let enabled = |id: &str| settings.get(id).filter(|s| s.enabled);

    let mut result = EnabledPlugins::default();
    for app in registry.apps() {
        if let Some(setting) = enabled(&app.base.id) {
            let mut app = app.clone();
            app.pinned = setting.pinned;
            result.apps.push(app);
        }
    }
    for ds in registry.data_sources() {
        if enabled(&ds.base.id).is_some() {
            result.data_sources.insert(ds.base.id.clone(), ds.clone());
        }
    }
    for panel in registry.panels() {
        if enabled(&panel.base.id).is_some() {
            result.panels.push(panel.clone());
        }
    }

    Ok(result)
}
