use serde::{Deserialize, Serialize};

/// Unique identifier for a plugin.
pub type PluginId = String;

/// Unique identifier for an organization.
pub type OrgId = i64;

/// Organization role required to see a plugin include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrgRole {
    #[default]
    Viewer,
    Editor,
    Admin,
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrgRole::Viewer => write!(f, "Viewer"),
            OrgRole::Editor => write!(f, "Editor"),
            OrgRole::Admin => write!(f, "Admin"),
        }
    }
}

/// Runtime environment of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}
