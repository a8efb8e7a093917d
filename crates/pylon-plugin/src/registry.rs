//! Typed plugin registries.
//!
//! Populated during discovery and read-only once published. Each capability
//! category has its own map; `plugins` holds the base descriptor of every
//! registered plugin regardless of category and is the source of truth for id
//! uniqueness.

use std::collections::BTreeMap;
use tracing::debug;

use crate::descriptor::{PluginDescriptor, PluginType};
use crate::frontend::StaticRoute;
use crate::kinds::{AppPlugin, DataSourcePlugin, PanelPlugin, Plugin, RendererPlugin};

#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    data_sources: BTreeMap<String, DataSourcePlugin>,
    panels: BTreeMap<String, PanelPlugin>,
    apps: BTreeMap<String, AppPlugin>,
    renderers: BTreeMap<String, RendererPlugin>,
    plugins: BTreeMap<String, PluginDescriptor>,
    static_routes: Vec<StaticRoute>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Insert into the typed and combined maps. Returns the plugin back if
    /// its id is already taken; nothing is modified in that case.
    pub(crate) fn insert(&mut self, plugin: Plugin) -> Result<(), Box<Plugin>> {
        if self.contains(plugin.id()) {
            return Err(Box::new(plugin));
        }
        let id = plugin.id().to_string();
        self.plugins.insert(id.clone(), plugin.base().clone());
        match plugin {
            Plugin::DataSource(p) => {
                self.data_sources.insert(id, p);
            }
            Plugin::Panel(p) => {
                self.panels.insert(id, p);
            }
            Plugin::App(p) => {
                self.apps.insert(id, p);
            }
            Plugin::Renderer(p) => {
                self.renderers.insert(id, p);
            }
        }
        Ok(())
    }

    pub(crate) fn add_static_route(&mut self, route: StaticRoute) {
        self.static_routes.push(route);
    }

    // ── Lookups ────────────────────────────────────────────────

    pub fn get_plugin(&self, id: &str) -> Option<&PluginDescriptor> {
        self.plugins.get(id)
    }

    pub fn get_datasource(&self, id: &str) -> Option<&DataSourcePlugin> {
        self.data_sources.get(id)
    }

    pub fn get_panel(&self, id: &str) -> Option<&PanelPlugin> {
        self.panels.get(id)
    }

    pub fn get_app(&self, id: &str) -> Option<&AppPlugin> {
        self.apps.get(id)
    }

    /// The active renderer: the first registered by id order.
    pub fn renderer(&self) -> Option<&RendererPlugin> {
        self.renderers.values().next()
    }

    pub fn is_app_installed(&self, id: &str) -> bool {
        self.apps.contains_key(id)
    }

    // ── Listings (id order) ────────────────────────────────────

    pub fn plugins(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.values()
    }

    pub fn data_sources(&self) -> impl Iterator<Item = &DataSourcePlugin> {
        self.data_sources.values()
    }

    pub fn panels(&self) -> impl Iterator<Item = &PanelPlugin> {
        self.panels.values()
    }

    pub fn apps(&self) -> impl Iterator<Item = &AppPlugin> {
        self.apps.values()
    }

    pub fn renderers(&self) -> impl Iterator<Item = &RendererPlugin> {
        self.renderers.values()
    }

    pub fn plugins_of_type(&self, kind: PluginType) -> Vec<&PluginDescriptor> {
        self.plugins
            .values()
            .filter(|p| p.kind() == Some(kind))
            .collect()
    }

    pub fn static_routes(&self) -> &[StaticRoute] {
        &self.static_routes
    }

    /// Mark panels and data sources that an app includes as belonging to it.
    pub(crate) fn link_app_includes(&mut self) {
        let mut links = Vec::new();
        for app in self.apps.values() {
            for include in &app.base.includes {
                let kind: Option<PluginType> = include.include_type.parse().ok();
                if matches!(kind, Some(PluginType::Panel | PluginType::DataSource)) && !include.id.is_empty() {
                    links.push((include.id.clone(), app.base.id.clone()));
                }
            }
        }

        for (plugin_id, app_id) in links {
            let mut linked = false;
            if let Some(panel) = self.panels.get_mut(&plugin_id) {
                panel.base.included_in_app_id = Some(app_id.clone());
                linked = true;
            }
            if let Some(ds) = self.data_sources.get_mut(&plugin_id) {
                ds.base.included_in_app_id = Some(app_id.clone());
                linked = true;
            }
            if linked {
                if let Some(base) = self.plugins.get_mut(&plugin_id) {
                    base.included_in_app_id = Some(app_id.clone());
                }
                debug!(id = %plugin_id, app = %app_id, "plugin included in app");
            }
        }
    }
}
