//! Load connection profiles and pick the one for the running environment.

use crate::config::{ConnectionProfile, DatabaseUrl, Driver};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_PROFILES_PATH: &str = "ormconfig.json";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PUBLIC_DIR: &str = "public";

/// Profiles used when no profiles file exists: memory for development and test,
/// postgres (from `DATABASE_URL`) for production.
pub fn default_profiles() -> Vec<ConnectionProfile> {
    vec![
        ConnectionProfile::memory("development"),
        ConnectionProfile::memory("test"),
        ConnectionProfile {
            name: "production".into(),
            driver: Driver::Postgres,
            url: None,
            max_connections: 10,
            synchronize: true,
        },
    ]
}

/// Read the profiles file (a JSON array). A missing file yields the defaults.
pub fn load_profiles(path: &Path) -> Result<Vec<ConnectionProfile>, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no profiles file, using defaults");
        return Ok(default_profiles());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

pub fn select_profile(profiles: &[ConnectionProfile], environment: &str) -> Result<ConnectionProfile, ConfigError> {
    profiles
        .iter()
        .find(|p| p.name == environment)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownProfile(environment.to_string()))
}

/// In production a complete `DATABASE_URL` replaces the profile's driver and url.
pub fn apply_database_url(profile: &mut ConnectionProfile, database_url: Option<&str>) -> Result<(), ConfigError> {
    let Some(raw) = database_url else {
        return Ok(());
    };
    match DatabaseUrl::parse(raw)? {
        Some(url) => {
            profile.driver = url.driver()?;
            profile.url = Some(url.to_url());
        }
        None => {
            tracing::warn!("DATABASE_URL is not a complete connection url, keeping profile settings");
        }
    }
    Ok(())
}

/// Process settings resolved at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    pub environment: String,
    pub port: u16,
    pub profile: ConnectionProfile,
    /// Static files served for requests no route claims.
    pub public_dir: PathBuf,
}

impl Settings {
    /// `APP_ENV`, `ORM_CONFIG`, `PORT`, `PUBLIC_DIR` and (in production) `DATABASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENVIRONMENT.into());
        let profiles_path = std::env::var("ORM_CONFIG").unwrap_or_else(|_| DEFAULT_PROFILES_PATH.into());
        let port = match std::env::var("PORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| ConfigError::Load(format!("invalid PORT: {}", p)))?,
            Err(_) => DEFAULT_PORT,
        };
        let profiles = load_profiles(Path::new(&profiles_path))?;
        let mut settings = Self::resolve(&environment, port, &profiles, std::env::var("DATABASE_URL").ok().as_deref())?;
        if let Ok(dir) = std::env::var("PUBLIC_DIR") {
            settings.public_dir = PathBuf::from(dir);
        }
        Ok(settings)
    }

    pub fn resolve(
        environment: &str,
        port: u16,
        profiles: &[ConnectionProfile],
        database_url: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut profile = select_profile(profiles, environment)?;
        if environment == "production" {
            apply_database_url(&mut profile, database_url)?;
        }
        Ok(Settings {
            environment: environment.to_string(),
            port,
            profile,
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_profile_is_fatal() {
        let err = Settings::resolve("staging", 3000, &default_profiles(), None).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile(env) if env == "staging"));
    }

    #[test]
    fn development_defaults_to_memory() {
        let settings = Settings::resolve("development", 3000, &default_profiles(), None).unwrap();
        assert_eq!(settings.profile.driver, Driver::Memory);
    }

    #[test]
    fn production_takes_database_url() {
        let settings = Settings::resolve(
            "production",
            8080,
            &default_profiles(),
            Some("postgres://u:p@db.internal:5433/bestiary"),
        )
        .unwrap();
        assert_eq!(settings.profile.driver, Driver::Postgres);
        assert_eq!(settings.profile.url.as_deref(), Some("postgres://u:p@db.internal:5433/bestiary"));
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn database_url_is_ignored_outside_production() {
        let settings = Settings::resolve("test", 3000, &default_profiles(), Some("postgres://u:p@h/db")).unwrap();
        assert_eq!(settings.profile.driver, Driver::Memory);
        assert!(settings.profile.url.is_none());
    }

    #[test]
    fn profiles_file_parses_camel_case() {
        let raw = r#"[{"name": "development", "driver": "postgres", "url": "postgres://localhost/bestiary", "maxConnections": 2, "synchronize": true}]"#;
        let profiles: Vec<ConnectionProfile> = serde_json::from_str(raw).unwrap();
        assert_eq!(profiles[0].max_connections, 2);
        assert!(profiles[0].synchronize);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let profiles = load_profiles(Path::new("/nonexistent/ormconfig.json")).unwrap();
        assert_eq!(profiles.len(), 3);
    }
}
