//! Registration of accepted plugins into the typed registries.

use pylon_core::{OrgRole, PylonError, Result};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::descriptor::{ANY_HOST_VERSION, PluginDescriptor, PluginType};
use crate::frontend;
use crate::kinds::loader_for;
use crate::registry::PluginRegistry;

pub struct Registrar<'a> {
    registry: &'a mut PluginRegistry,
    static_root: &'a Path,
}

impl<'a> Registrar<'a> {
    pub fn new(registry: &'a mut PluginRegistry, static_root: &'a Path) -> Self {
        Self {
            registry,
            static_root,
        }
    }

    /// Register one accepted plugin.
    ///
    /// `Ok(Some(_))` carries a non-fatal registration fault (a duplicate id or
    /// a manifest that fails its typed parse); `Err` is fatal for the whole scan.
    pub fn register(&mut self, discovered: &PluginDescriptor) -> Result<Option<PylonError>> {
        debug!(id = %discovered.id, "attempting to add plugin");

        let kind: PluginType = discovered.plugin_type.parse().map_err(|_| PylonError::UnknownPluginType {
            id: discovered.id.clone(),
            plugin_type: discovered.plugin_type.clone(),
        })?;

        let external = frontend::is_external(discovered, self.static_root);
        if external && !kind.is_backend_only() {
            let module = discovered.directory.join("module.js");
            if !module.try_exists()? {
                warn!(
                    name = %discovered.name,
                    path = %module.display(),
                    "plugin missing module.js, if you loaded this plugin from git, make sure to compile it"
                );
            }
        }

        let manifest_path = discovered.manifest_path();
        let bytes = std::fs::read(&manifest_path)?;
        let mut plugin = match loader_for(kind)(&bytes) {
            Ok(plugin) => plugin,
            Err(e) => {
                warn!(id = %discovered.id, error = %e, "skipping plugin with malformed manifest");
                return Ok(Some(PylonError::MalformedManifest {
                    path: manifest_path,
                    reason: e.to_string(),
                }));
            }
        };

        let base = plugin.base_mut();
        apply_defaults(base);
        base.directory = discovered.directory.clone();
        base.files = discovered.files.clone();
        base.signature = discovered.signature;
        base.signature_type = discovered.signature_type.clone();
        base.signing_org = discovered.signing_org.clone();
        base.is_core = discovered.is_core;
        base.root = discovered.root.clone();
        let route = frontend::init_frontend(base, self.static_root);

        let id = plugin.id().to_string();
        if self.registry.insert(plugin).is_err() {
            warn!(id = %id, "plugin is duplicate");
            let existing = self
                .registry
                .get_plugin(&id)
                .map(|p| p.directory.clone())
                .unwrap_or_default();
            return Ok(Some(PylonError::DuplicatePlugin {
                id,
                existing,
                duplicate: discovered.directory.clone(),
            }));
        }
        if external {
            info!(id = %id, "Registering plugin");
        }
        if let Some(route) = route {
            self.registry.add_static_route(route);
        }

        debug!(id = %id, kind = %kind, "successfully added plugin");
        Ok(None)
    }
}

fn apply_defaults(base: &mut PluginDescriptor) {
    if base.dependencies.host_version.trim().is_empty() {
        base.dependencies.host_version = ANY_HOST_VERSION.to_string();
    }
    for include in &mut base.includes {
        if include.role.is_none() {
            include.role = Some(OrgRole::Viewer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::parse_descriptor;
    use crate::signature::SignatureStatus;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn discover(dir: &Path) -> PluginDescriptor {
        let mut d = parse_descriptor(&dir.join("plugin.json")).unwrap();
        d.signature = SignatureStatus::Valid;
        d.signing_org = Some("Acme".into());
        d
    }

    #[test]
    fn registers_with_defaults_and_copied_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("plugins/acme-app");
        write(
            &dir,
            "plugin.json",
            r#"{"id": "acme-app", "type": "app", "autoEnabled": true, "includes": [{"type": "page", "name": "Home"}]}"#,
        );
        write(&dir, "module.js", "");

        let mut registry = PluginRegistry::new();
        let static_root = tmp.path().join("public");
        let fault = Registrar::new(&mut registry, &static_root)
            .register(&discover(&dir))
            .unwrap();
        assert!(fault.is_none());

        let app = registry.get_app("acme-app").unwrap();
        assert!(app.auto_enabled);
        assert_eq!(app.base.dependencies.host_version, "*");
        assert!(app.base.dependencies.plugins.is_empty());
        assert_eq!(app.base.includes[0].role, Some(OrgRole::Viewer));
        assert_eq!(app.base.directory, dir);
        assert_eq!(app.base.signature, SignatureStatus::Valid);
        assert_eq!(app.base.signing_org.as_deref(), Some("Acme"));
        assert_eq!(app.base.module, "plugins/acme-app/module");
        assert_eq!(registry.static_routes().len(), 1);
        assert_eq!(registry.get_plugin("acme-app").unwrap().base_url, "public/plugins/acme-app");
    }

    #[test]
    fn duplicate_keeps_first() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("a/dup");
        let second = tmp.path().join("b/dup");
        write(&first, "plugin.json", r#"{"id": "dup", "type": "panel", "name": "First"}"#);
        write(&second, "plugin.json", r#"{"id": "dup", "type": "datasource", "name": "Second"}"#);

        let mut registry = PluginRegistry::new();
        let static_root = tmp.path().join("public");
        let mut registrar = Registrar::new(&mut registry, &static_root);
        assert!(registrar.register(&discover(&first)).unwrap().is_none());
        let fault = registrar.register(&discover(&second)).unwrap();
        assert!(matches!(fault, Some(PylonError::DuplicatePlugin { ref id, .. }) if id == "dup"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_plugin("dup").unwrap().name, "First");
        assert!(registry.get_datasource("dup").is_none());
        assert_eq!(registry.static_routes().len(), 1);
    }

    #[test]
    fn typed_parse_failure_is_a_fault() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "plugin.json", r#"{"id": "acme-ds", "type": "datasource", "routes": "api"}"#);
        let mut registry = PluginRegistry::new();
        let static_root = tmp.path().join("public");
        let fault = Registrar::new(&mut registry, &static_root)
            .register(&discover(tmp.path()))
            .unwrap();
        assert!(matches!(fault, Some(PylonError::MalformedManifest { .. })));
        assert!(registry.is_empty());
        assert!(registry.static_routes().is_empty());
    }

    #[test]
    fn unknown_type_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "plugin.json", r#"{"id": "odd", "type": "widget"}"#);
        let mut registry = PluginRegistry::new();
        let static_root = tmp.path().join("public");
        let err = Registrar::new(&mut registry, &static_root)
            .register(&discover(tmp.path()))
            .unwrap_err();
        assert!(matches!(err, PylonError::UnknownPluginType { .. }));
        assert!(registry.is_empty());
    }
}
