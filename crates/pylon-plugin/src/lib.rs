//! # pylon-plugin
//!
//! Plugin discovery for the Pylon host. A scan walks a root directory for
//! `plugin.json` manifests, resolves each plugin's signature envelope, binds
//! nested plugins to their outermost ancestor, applies the trust policy and
//! registers accepted plugins into typed registries.
//!
//! ```text
//! Scanner ─→ ancestry ─→ TrustValidator ─→ Registrar ─→ PluginRegistry
//!    │                         │
//!    └─ parse faults           └─ signature rejections (per id)
//! ```

pub mod ancestry;
pub mod descriptor;
pub mod frontend;
pub mod kinds;
pub mod manager;
pub mod registrar;
pub mod registry;
pub mod scanner;
pub mod settings;
pub mod signature;
pub mod trust;
pub mod update;

pub use descriptor::{PluginDescriptor, PluginInclude, PluginType};
pub use frontend::StaticRoute;
pub use kinds::{AppPlugin, DataSourcePlugin, PanelPlugin, Plugin, RendererPlugin};
pub use manager::{PluginManager, ScanReport};
pub use registry::PluginRegistry;
pub use scanner::{ScanRoot, Scanner};
pub use settings::{EnabledPlugins, PluginSettingInfo, PluginSettingsStore};
pub use signature::{SignatureStatus, SignatureVerifier};
pub use trust::{PluginError, PluginErrorCode, TrustDecision, UnsignedPolicy};
pub use update::{HttpVersionSource, UpdateChecker, UpdateStatus, VersionSource};
