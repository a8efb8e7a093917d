//! Typed plugins, one per capability category.
//!
//! Each type embeds the shared [`PluginDescriptor`] and adds the fields only
//! that category declares. [`loader_for`] is the fixed type-to-loader table
//! used by the registrar to re-parse a manifest into its typed form.

use pylon_core::OrgRole;
use serde::{Deserialize, Serialize};

use crate::descriptor::{PluginDescriptor, PluginType, deserialize_role};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteHeader {
    pub name: String,
    pub content: String,
}

/// A proxy route declared by a data source or app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginRoute {
    pub path: String,
    pub method: String,
    #[serde(deserialize_with = "deserialize_role")]
    pub req_role: Option<OrgRole>,
    pub url: String,
    pub headers: Vec<RouteHeader>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataSourcePlugin {
    #[serde(flatten)]
    pub base: PluginDescriptor,
    pub annotations: bool,
    pub metrics: bool,
    pub alerting: bool,
    pub explore: bool,
    pub table: bool,
    pub logs: bool,
    pub streaming: bool,
    pub built_in: bool,
    pub mixed: bool,
    pub routes: Vec<PluginRoute>,
    pub executable: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanelPlugin {
    #[serde(flatten)]
    pub base: PluginDescriptor,
    pub skip_data_query: bool,
    pub hide_from_list: bool,
    pub sort: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppPlugin {
    #[serde(flatten)]
    pub base: PluginDescriptor,
    pub auto_enabled: bool,
    pub routes: Vec<PluginRoute>,
    /// Per-org state, filled in by the settings queries.
    #[serde(skip_deserializing)]
    pub pinned: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererPlugin {
    #[serde(flatten)]
    pub base: PluginDescriptor,
    pub executable: String,
}

/// A registered plugin of any capability category.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Plugin {
    DataSource(DataSourcePlugin),
    Panel(PanelPlugin),
    App(AppPlugin),
    Renderer(RendererPlugin),
}

impl Plugin {
    pub fn base(&self) -> &PluginDescriptor {
        match self {
            Plugin::DataSource(p) => &p.base,
            Plugin::Panel(p) => &p.base,
            Plugin::App(p) => &p.base,
            Plugin::Renderer(p) => &p.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut PluginDescriptor {
        match self {
            Plugin::DataSource(p) => &mut p.base,
            Plugin::Panel(p) => &mut p.base,
            Plugin::App(p) => &mut p.base,
            Plugin::Renderer(p) => &mut p.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn kind(&self) -> PluginType {
        match self {
            Plugin::DataSource(_) => PluginType::DataSource,
            Plugin::Panel(_) => PluginType::Panel,
            Plugin::App(_) => PluginType::App,
            Plugin::Renderer(_) => PluginType::Renderer,
        }
    }
}

/// Parses a full `plugin.json` into a typed plugin.
pub type PluginLoader = fn(&[u8]) -> serde_json::Result<Plugin>;

pub fn loader_for(kind: PluginType) -> PluginLoader {
    match kind {
        PluginType::DataSource => load_datasource,
        PluginType::Panel => load_panel,
        PluginType::App => load_app,
        PluginType::Renderer => load_renderer,
    }
}

fn load_datasource(bytes: &[u8]) -> serde_json::Result<Plugin> {
    serde_json::from_slice(bytes).map(Plugin::DataSource)
}

fn load_panel(bytes: &[u8]) -> serde_json::Result<Plugin> {
    serde_json::from_slice(bytes).map(Plugin::Panel)
}

fn load_app(bytes: &[u8]) -> serde_json::Result<Plugin> {
    serde_json::from_slice(bytes).map(Plugin::App)
}

fn load_renderer(bytes: &[u8]) -> serde_json::Result<Plugin> {
    serde_json::from_slice(bytes).map(Plugin::Renderer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_datasource_fields() {
        let json = br#"{
            "id": "acme-ds", "type": "datasource", "name": "Acme", "backend": true,
            "metrics": true, "alerting": true, "builtIn": false,
            "routes": [{"path": "api", "method": "GET", "reqRole": "Editor", "url": "https://acme.example"}],
            "executable": "gpx_acme"
        }"#;
        let plugin = loader_for(PluginType::DataSource)(json).unwrap();
        assert_eq!(plugin.kind(), PluginType::DataSource);
        assert_eq!(plugin.id(), "acme-ds");
        let Plugin::DataSource(ds) = plugin else {
            panic!("expected a data source");
        };
        assert!(ds.metrics && ds.alerting);
        assert_eq!(ds.routes[0].req_role, Some(OrgRole::Editor));
        assert_eq!(ds.executable, "gpx_acme");
        assert!(ds.base.backend);
    }

    #[test]
    fn unknown_route_role_is_unset() {
        let json = br#"{"id": "acme-ds", "type": "datasource", "routes": [{"path": "api", "reqRole": "Grafana Admin"}]}"#;
        let Plugin::DataSource(ds) = loader_for(PluginType::DataSource)(json).unwrap() else {
            panic!("expected a data source");
        };
        assert_eq!(ds.routes[0].path, "api");
        assert_eq!(ds.routes[0].req_role, None);
    }

    #[test]
    fn loads_app_without_pinned() {
        let json = br#"{"id": "acme-app", "type": "app", "autoEnabled": true, "pinned": true}"#;
        let Plugin::App(app) = loader_for(PluginType::App)(json).unwrap() else {
            panic!("expected an app");
        };
        assert!(app.auto_enabled);
        assert!(!app.pinned);
    }

    #[test]
    fn loads_panel_and_renderer() {
        let panel = loader_for(PluginType::Panel)(br#"{"id": "p", "type": "panel", "skipDataQuery": true, "sort": 3}"#).unwrap();
        let Plugin::Panel(panel) = panel else {
            panic!("expected a panel");
        };
        assert!(panel.skip_data_query);
        assert_eq!(panel.sort, 3);

        let renderer = loader_for(PluginType::Renderer)(br#"{"id": "r", "type": "renderer", "executable": "plugin_start"}"#).unwrap();
        assert_eq!(renderer.kind(), PluginType::Renderer);
    }

    #[test]
    fn base_mut_reaches_embedded_descriptor() {
        let mut plugin = loader_for(PluginType::Panel)(br#"{"id": "p", "type": "panel"}"#).unwrap();
        plugin.base_mut().module = "plugins/p/module".into();
        assert_eq!(plugin.base().module, "plugins/p/module");
    }
}
