//! Signature envelope (`MANIFEST.txt`) resolution.
//!
//! The envelope is a JSON document listing the SHA-256 of every file in the
//! plugin directory plus the declared plugin id and version, signed with an
//! Ed25519 key. The signature covers the canonical JSON encoding of every
//! field except `signature` itself.

use base64::Engine;
use pylon_config::TrustedKey;
use pylon_core::{PylonError, Result};
use ring::signature::{ED25519, UnparsedPublicKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path};
use tracing::debug;

use crate::descriptor::PluginDescriptor;

/// Signature envelope file name. Never part of a plugin's file manifest.
pub const SIGNATURE_FILE_NAME: &str = "MANIFEST.txt";

/// Trust state of a plugin directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    /// Shipped with the host.
    Internal,
    Valid,
    Invalid,
    Modified,
    #[default]
    Unsigned,
}

impl std::fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignatureStatus::Internal => "internal",
            SignatureStatus::Valid => "valid",
            SignatureStatus::Invalid => "invalid",
            SignatureStatus::Modified => "modified",
            SignatureStatus::Unsigned => "unsigned",
        };
        f.write_str(s)
    }
}

/// Outcome of resolving a plugin's signature envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureState {
    pub status: SignatureStatus,
    pub signature_type: Option<String>,
    pub signing_org: Option<String>,
}

impl SignatureState {
    fn bare(status: SignatureStatus) -> Self {
        Self {
            status,
            signature_type: None,
            signing_org: None,
        }
    }
}

/// Signed content of `MANIFEST.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestBody {
    pub manifest_version: String,
    pub signature_type: String,
    pub signed_by_org: String,
    pub signed_by_org_name: String,
    pub plugin: String,
    pub version: String,
    pub key_id: String,
    /// Relative `/`-separated path → lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

impl ManifestBody {
    /// Build a body covering every file currently in `dir`.
    pub fn for_directory(
        dir: &Path,
        plugin: &str,
        version: &str,
        key_id: &str,
        org: &str,
    ) -> Result<Self> {
        let mut files = BTreeMap::new();
        for rel in crate::descriptor::collect_plugin_files(dir)? {
            let bytes = std::fs::read(dir.join(&rel))?;
            files.insert(rel, sha256_hex(&bytes));
        }
        Ok(Self {
            manifest_version: "2.0.0".into(),
            signature_type: "community".into(),
            signed_by_org: org.into(),
            signed_by_org_name: org.into(),
            plugin: plugin.into(),
            version: version.into(),
            key_id: key_id.into(),
            files,
        })
    }

    /// Bytes covered by the signature.
    pub fn signing_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// The on-disk envelope: signed body plus base64 signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedManifest {
    #[serde(flatten)]
    pub body: ManifestBody,
    pub signature: String,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(ring::digest::digest(&ring::digest::SHA256, bytes).as_ref())
}

/// Resolves signature state against a set of trusted Ed25519 keys.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    keys: HashMap<String, Vec<u8>>,
}

impl SignatureVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key_id: impl Into<String>, public_key: Vec<u8>) -> Self {
        self.keys.insert(key_id.into(), public_key);
        self
    }

    pub fn from_trusted_keys(keys: &[TrustedKey]) -> Result<Self> {
        let mut verifier = Self::new();
        for key in keys {
            let bytes = key.decode().map_err(PylonError::Config)?;
            verifier.keys.insert(key.key_id.clone(), bytes);
        }
        Ok(verifier)
    }

    /// Check the envelope signature against the key it names.
    pub fn verify(&self, manifest: &SignedManifest) -> Result<()> {
        let key = self.keys.get(&manifest.body.key_id).ok_or_else(|| {
            PylonError::Signature(format!("untrusted signing key '{}'", manifest.body.key_id))
        })?;
        let signature = base64::engine::general_purpose::STANDARD
            .decode(manifest.signature.trim())
            .map_err(|e| PylonError::Signature(format!("signature is not base64: {e}")))?;
        let payload = manifest.body.signing_payload()?;
        UnparsedPublicKey::new(&ED25519, key)
            .verify(&payload, &signature)
            .map_err(|_| PylonError::Signature("signature verification failed".into()))
    }

    /// Compute the signature state of a discovered plugin.
    ///
    /// Reads the filesystem only; the descriptor is not modified.
    pub fn resolve(&self, plugin: &PluginDescriptor) -> Result<SignatureState> {
        if plugin.is_core {
            return Ok(SignatureState::bare(SignatureStatus::Internal));
        }

        let envelope_path = plugin.directory.join(SIGNATURE_FILE_NAME);
        let raw = match std::fs::read(&envelope_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(id = %plugin.id, "no signature envelope found");
                return Ok(SignatureState::bare(SignatureStatus::Unsigned));
            }
            Err(e) => return Err(e.into()),
        };

        let manifest: SignedManifest = match serde_json::from_slice(&raw) {
            Ok(m) => m,
            Err(e) => {
                debug!(id = %plugin.id, error = %e, "signature envelope could not be decoded");
                return Ok(SignatureState::bare(SignatureStatus::Invalid));
            }
        };

        if let Err(e) = self.verify(&manifest) {
            debug!(id = %plugin.id, error = %e, "signature envelope failed verification");
            return Ok(SignatureState::bare(SignatureStatus::Invalid));
        }

        let body = &manifest.body;
        if body.plugin != plugin.id {
            debug!(id = %plugin.id, signed_id = %body.plugin, "plugin id mismatch");
            return Ok(SignatureState::bare(SignatureStatus::Modified));
        }
        if body.version != plugin.info.version {
            debug!(
                id = %plugin.id,
                version = %plugin.info.version,
                signed_version = %body.version,
                "plugin version mismatch"
            );
            return Ok(SignatureState::bare(SignatureStatus::Modified));
        }

        for (rel, expected) in &body.files {
            if !is_contained(rel) {
                debug!(id = %plugin.id, file = %rel, "signed path escapes plugin directory");
                return Ok(SignatureState::bare(SignatureStatus::Modified));
            }
            let actual = match std::fs::read(plugin.directory.join(rel)) {
                Ok(bytes) => sha256_hex(&bytes),
                Err(e) => {
                    debug!(id = %plugin.id, file = %rel, error = %e, "signed file unreadable");
                    return Ok(SignatureState::bare(SignatureStatus::Modified));
                }
            };
            if !actual.eq_ignore_ascii_case(expected) {
                debug!(id = %plugin.id, file = %rel, "file hash mismatch");
                return Ok(SignatureState::bare(SignatureStatus::Modified));
            }
        }

        if let Some(extra) = plugin.files.iter().find(|f| !body.files.contains_key(*f)) {
            debug!(id = %plugin.id, file = %extra, "file not covered by signature");
            return Ok(SignatureState::bare(SignatureStatus::Modified));
        }

        Ok(SignatureState {
            status: SignatureStatus::Valid,
            signature_type: Some(body.signature_type.clone()),
            signing_org: Some(body.signed_by_org.clone()),
        })
    }
}

fn is_contained(rel: &str) -> bool {
    Path::new(rel)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}
