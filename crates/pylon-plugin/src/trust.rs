//! Trust decisions for discovered plugins.
//!
//! Signing is enforced only for backend-capable plugins found under a root
//! that requires it. Nested plugins inherit the signature status of their
//! root plugin before the decision is made.

use pylon_core::{PluginId, PylonError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::descriptor::PluginDescriptor;
use crate::signature::SignatureStatus;

/// Why a plugin was excluded from the registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PluginErrorCode {
    SignatureMissing,
    SignatureInvalid,
    SignatureModified,
}

impl std::fmt::Display for PluginErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PluginErrorCode::SignatureMissing => "signatureMissing",
            PluginErrorCode::SignatureInvalid => "signatureInvalid",
            PluginErrorCode::SignatureModified => "signatureModified",
        })
    }
}

/// A rejected plugin as surfaced to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginError {
    pub plugin_id: PluginId,
    pub error_code: PluginErrorCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    Accept,
    Reject(PluginErrorCode),
}

impl TrustDecision {
    pub fn is_accepted(self) -> bool {
        self == TrustDecision::Accept
    }
}

/// Caller-supplied check deciding whether an unsigned backend plugin may run.
pub type UnsignedCondition = Arc<dyn Fn(&PluginDescriptor) -> bool + Send + Sync>;

/// Overrides that let unsigned backend plugins through an enforcing scan.
#[derive(Clone, Default)]
pub struct UnsignedPolicy {
    /// When set, this alone decides; the other overrides are not consulted.
    pub condition: Option<UnsignedCondition>,
    pub development: bool,
    pub allow_list: HashSet<String>,
}

impl std::fmt::Debug for UnsignedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsignedPolicy")
            .field("condition", &self.condition.as_ref().map(|_| "<fn>"))
            .field("development", &self.development)
            .field("allow_list", &self.allow_list)
            .finish()
    }
}

impl UnsignedPolicy {
    pub fn new(development: bool, allow_list: impl IntoIterator<Item = String>) -> Self {
        Self {
            condition: None,
            development,
            allow_list: allow_list.into_iter().collect(),
        }
    }

    pub fn with_condition(mut self, condition: UnsignedCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn allows(&self, plugin: &PluginDescriptor) -> bool {
        if let Some(condition) = &self.condition {
            return condition(plugin);
        }
        self.development || self.allow_list.contains(&plugin.id)
    }
}

/// Signature status of a root plugin, captured before any descendant is
/// validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootTrust {
    pub id: String,
    pub signature: SignatureStatus,
}

impl RootTrust {
    pub fn of(plugin: &PluginDescriptor) -> Self {
        Self {
            id: plugin.id.clone(),
            signature: plugin.signature,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrustValidator<'a> {
    policy: &'a UnsignedPolicy,
    require_signing: bool,
}

impl<'a> TrustValidator<'a> {
    pub fn new(policy: &'a UnsignedPolicy, require_signing: bool) -> Self {
        Self {
            policy,
            require_signing,
        }
    }

    /// Decide whether `plugin` may be registered.
    ///
    /// May overwrite `plugin.signature` with the root's status. An `Err` is
    /// a fatal fault and aborts the scan.
    pub fn validate(
        &self,
        plugin: &mut PluginDescriptor,
        root: Option<&RootTrust>,
    ) -> Result<TrustDecision> {
        if plugin.signature == SignatureStatus::Valid {
            debug!(id = %plugin.id, "plugin has valid signature");
            return Ok(TrustDecision::Accept);
        }

        let inherits = !plugin.is_core && plugin.signature != SignatureStatus::Internal;
        if let Some(root) = root.filter(|_| inherits) {
            debug!(
                id = %plugin.id,
                root = %root.id,
                status = %root.signature,
                "inheriting signature status from root plugin"
            );
            plugin.signature = root.signature;
            if plugin.signature == SignatureStatus::Valid {
                return Ok(TrustDecision::Accept);
            }
        }

        if !plugin.is_backend() || !self.require_signing {
            return Ok(TrustDecision::Accept);
        }

        match plugin.signature {
            SignatureStatus::Unsigned => {
                if self.policy.allows(plugin) {
                    warn!(id = %plugin.id, "Running an unsigned backend plugin");
                    Ok(TrustDecision::Accept)
                } else {
                    warn!(id = %plugin.id, "plugin is unsigned");
                    Ok(TrustDecision::Reject(PluginErrorCode::SignatureMissing))
                }
            }
            SignatureStatus::Invalid => {
                warn!(id = %plugin.id, "plugin has an invalid signature");
                Ok(TrustDecision::Reject(PluginErrorCode::SignatureInvalid))
            }
            SignatureStatus::Modified => {
                warn!(id = %plugin.id, "plugin has a modified signature");
                Ok(TrustDecision::Reject(PluginErrorCode::SignatureModified))
            }
            other => Err(PylonError::UnexpectedSignatureState {
                id: plugin.id.clone(),
                state: other.to_string(),
            }),
        }
    }
}
