//! Plugin descriptors decoded from `plugin.json`.
//!
//! A [`PluginDescriptor`] carries the fields every plugin type shares. The
//! manifest-declared fields are deserialized; the fields discovered on disk
//! (directory, file manifest, signature state, ancestry) are filled in by the
//! scanner and are never read from the manifest.

use pylon_core::{OrgRole, PylonError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::signature::{SIGNATURE_FILE_NAME, SignatureStatus};

/// Standard plugin manifest file name.
pub const MANIFEST_FILE_NAME: &str = "plugin.json";

/// Wildcard host version constraint applied when a plugin declares none.
pub const ANY_HOST_VERSION: &str = "*";

/// Capability category of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginType {
    #[serde(rename = "datasource")]
    DataSource,
    #[serde(rename = "panel")]
    Panel,
    #[serde(rename = "app")]
    App,
    #[serde(rename = "renderer")]
    Renderer,
}

impl PluginType {
    pub const ALL: [PluginType; 4] = [
        PluginType::DataSource,
        PluginType::Panel,
        PluginType::App,
        PluginType::Renderer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PluginType::DataSource => "datasource",
            PluginType::Panel => "panel",
            PluginType::App => "app",
            PluginType::Renderer => "renderer",
        }
    }

    /// Backend-only plugins ship no frontend module.
    pub fn is_backend_only(self) -> bool {
        self == PluginType::Renderer
    }
}

impl std::fmt::Display for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PluginType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PluginType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown plugin type '{s}'"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginAuthor {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginInfo {
    pub version: String,
    pub description: String,
    pub author: PluginAuthor,
    pub keywords: Vec<String>,
    pub updated: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginDependencyItem {
    pub id: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginDependencies {
    /// Semver constraint on the host version.
    #[serde(rename = "grafanaVersion", alias = "hostVersion")]
    pub host_version: String,
    pub plugins: Vec<PluginDependencyItem>,
}

impl PluginDependencies {
    /// Parse the host version constraint. `None` when it is not valid semver.
    pub fn host_version_req(&self) -> Option<semver::VersionReq> {
        semver::VersionReq::parse(self.host_version.trim()).ok()
    }
}

/// A page, dashboard or nested plugin exposed by a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginInclude {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub include_type: String,
    pub component: String,
    #[serde(deserialize_with = "deserialize_role")]
    pub role: Option<OrgRole>,
    pub add_to_nav: bool,
    pub default_nav: bool,
    pub slug: String,
    pub icon: String,
    pub id: String,
}

/// An empty or unrecognized role string means "unset"; the registrar fills in
/// the default.
pub(crate) fn deserialize_role<'de, D>(deserializer: D) -> std::result::Result<Option<OrgRole>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(r) if r.eq_ignore_ascii_case("viewer") => Ok(Some(OrgRole::Viewer)),
        Some(r) if r.eq_ignore_ascii_case("editor") => Ok(Some(OrgRole::Editor)),
        Some(r) if r.eq_ignore_ascii_case("admin") => Ok(Some(OrgRole::Admin)),
        Some(other) => {
            warn!(role = %other, "ignoring unknown role");
            Ok(None)
        }
    }
}

/// Base descriptor shared by every plugin type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginDescriptor {
    pub id: String,
    /// Declared type, kept raw so an unknown type surfaces at registration.
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub name: String,
    pub info: PluginInfo,
    pub dependencies: PluginDependencies,
    pub includes: Vec<PluginInclude>,
    pub backend: bool,
    #[serde(rename = "core")]
    pub is_core: bool,

    #[serde(skip_deserializing)]
    pub directory: PathBuf,
    /// Files under `directory`, `/`-separated, excluding the signature envelope.
    #[serde(skip_deserializing)]
    pub files: Vec<String>,
    #[serde(skip_deserializing)]
    pub signature: SignatureStatus,
    #[serde(skip_deserializing)]
    pub signature_type: Option<String>,
    #[serde(skip_deserializing)]
    pub signing_org: Option<String>,
    /// Directory of the outermost discovered ancestor plugin.
    #[serde(skip_deserializing)]
    pub root: Option<PathBuf>,
    #[serde(skip_deserializing)]
    pub included_in_app_id: Option<String>,
    #[serde(skip_deserializing)]
    pub module: String,
    #[serde(skip_deserializing)]
    pub base_url: String,
}

impl PluginDescriptor {
    /// The declared type, if it is one of the known capability categories.
    pub fn kind(&self) -> Option<PluginType> {
        self.plugin_type.parse().ok()
    }

    pub fn is_backend_only(&self) -> bool {
        self.kind().is_some_and(PluginType::is_backend_only)
    }

    /// Backend-capable plugins are the only ones subject to signing enforcement.
    pub fn is_backend(&self) -> bool {
        self.backend || self.is_backend_only()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(MANIFEST_FILE_NAME)
    }
}

/// Decode `plugin.json` into a base descriptor and collect its file manifest.
pub fn parse_descriptor(manifest_path: &Path) -> Result<PluginDescriptor> {
    debug!(path = %manifest_path.display(), "loading plugin");
    let bytes = std::fs::read(manifest_path)?;
    let mut descriptor: PluginDescriptor =
        serde_json::from_slice(&bytes).map_err(|e| PylonError::MalformedManifest {
            path: manifest_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if descriptor.id.trim().is_empty() || descriptor.plugin_type.trim().is_empty() {
        return Err(PylonError::MalformedManifest {
            path: manifest_path.to_path_buf(),
            reason: format!("did not find type or id properties in {MANIFEST_FILE_NAME}"),
        });
    }

    let directory = manifest_path
        .parent()
        .ok_or_else(|| PylonError::MalformedManifest {
            path: manifest_path.to_path_buf(),
            reason: "manifest has no containing directory".into(),
        })?
        .to_path_buf();
    descriptor.files = collect_plugin_files(&directory)?;
    descriptor.directory = directory;

    Ok(descriptor)
}

/// List every file under `dir` that the signature envelope must cover.
///
/// Paths are relative to `dir`, `/`-separated and sorted, so the listing is
/// identical on every platform.
pub fn collect_plugin_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() || entry.file_name() == SIGNATURE_FILE_NAME {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).map_err(|e| {
            std::io::Error::other(format!(
                "{} is not under {}: {e}",
                entry.path().display(),
                dir.display()
            ))
        })?;
        let normalized: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        files.push(normalized.join("/"));
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn parse_minimal_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "plugin.json",
            r#"{"id": "acme-panel", "type": "panel", "name": "Acme", "info": {"version": "1.2.0"}}"#,
        );
        write(dir.path(), "module.js", "export {}");

        let d = parse_descriptor(&dir.path().join("plugin.json")).unwrap();
        assert_eq!(d.id, "acme-panel");
        assert_eq!(d.kind(), Some(PluginType::Panel));
        assert_eq!(d.info.version, "1.2.0");
        assert_eq!(d.directory, dir.path());
        assert_eq!(d.files, vec!["module.js", "plugin.json"]);
        assert_eq!(d.signature, SignatureStatus::Unsigned);
        assert!(d.root.is_none());
        assert!(!d.is_backend());
    }

    #[test]
    fn empty_id_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugin.json", r#"{"id": "", "type": "panel"}"#);
        let err = parse_descriptor(&dir.path().join("plugin.json")).unwrap_err();
        assert!(matches!(err, PylonError::MalformedManifest { .. }));
    }

    #[test]
    fn missing_type_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugin.json", r#"{"id": "x"}"#);
        assert!(matches!(
            parse_descriptor(&dir.path().join("plugin.json")),
            Err(PylonError::MalformedManifest { .. })
        ));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugin.json", "{ not json");
        assert!(matches!(
            parse_descriptor(&dir.path().join("plugin.json")),
            Err(PylonError::MalformedManifest { .. })
        ));
    }

    #[test]
    fn unknown_type_still_parses() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugin.json", r#"{"id": "odd", "type": "widget"}"#);
        let d = parse_descriptor(&dir.path().join("plugin.json")).unwrap();
        assert_eq!(d.plugin_type, "widget");
        assert!(d.kind().is_none());
    }

    #[test]
    fn file_listing_skips_envelope_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugin.json", "{}");
        write(dir.path(), "MANIFEST.txt", "{}");
        write(dir.path(), "img/logo.svg", "<svg/>");
        write(dir.path(), "nested/MANIFEST.txt", "{}");
        write(dir.path(), "nested/deep/file.js", "");

        let files = collect_plugin_files(dir.path()).unwrap();
        assert_eq!(files, vec!["img/logo.svg", "nested/deep/file.js", "plugin.json"]);
    }

    #[test]
    fn includes_and_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "plugin.json",
            r#"{
                "id": "acme-app", "type": "app", "backend": true,
                "dependencies": {"grafanaVersion": ">=7.0.0", "plugins": [{"id": "acme-panel", "type": "panel", "version": "1.0.0"}]},
                "includes": [
                    {"type": "panel", "id": "acme-panel", "role": ""},
                    {"type": "page", "name": "Admin", "role": "Admin"}
                ]
            }"#,
        );
        let d = parse_descriptor(&dir.path().join("plugin.json")).unwrap();
        assert!(d.is_backend());
        assert_eq!(d.dependencies.plugins[0].id, "acme-panel");
        assert!(d.dependencies.host_version_req().unwrap().matches(&semver::Version::new(7, 4, 0)));
        assert_eq!(d.includes[0].role, None);
        assert_eq!(d.includes[1].role, Some(OrgRole::Admin));
    }

    #[test]
    fn renderer_is_backend_only() {
        let d = PluginDescriptor {
            id: "image-renderer".into(),
            plugin_type: "renderer".into(),
            ..Default::default()
        };
        assert!(d.is_backend_only());
        assert!(d.is_backend());
    }
}
