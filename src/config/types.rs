//! Connection profile types matching the profiles JSON file.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Postgres,
    Memory,
}

impl std::str::FromStr for Driver {
    type Err = crate::error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Driver::Postgres),
            "memory" => Ok(Driver::Memory),
            _ => Err(crate::error::ConfigError::UnsupportedDriver(s.to_string())),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

/// One named storage connection. The active one is picked by `APP_ENV`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    pub name: String,
    pub driver: Driver,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Create missing tables at startup.
    #[serde(default)]
    pub synchronize: bool,
}

impl ConnectionProfile {
    pub fn memory(name: &str) -> Self {
        ConnectionProfile {
            name: name.to_string(),
            driver: Driver::Memory,
            url: None,
            max_connections: default_max_connections(),
            synchronize: false,
        }
    }
}
