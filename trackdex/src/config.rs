//! Configuration resolution for trackdex
//!
//! Every setting resolves with the same priority: environment
//! variable → TOML config file → compiled default. The AcoustID API
//! key has no default; startup fails with remediation text when it is
//! missing.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User agent sent to AcoustID and MusicBrainz. MusicBrainz requires
/// a contact-bearing agent string.
pub const USER_AGENT: &str = "trackdex/0.1.0 ( https://github.com/trackdex/trackdex )";

/// Default wait between the two stability size reads.
pub const DEFAULT_STABILITY_WAIT_SECS: u64 = 5;

/// Default pause after a registry enrichment attempt (MusicBrainz
/// recommends at most one request per second).
pub const DEFAULT_REGISTRY_PAUSE_MS: u64 = 1000;

/// On-disk TOML configuration shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub library_dir: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub acoustid_api_key: Option<String>,
    pub stability_wait_seconds: Option<u64>,
    pub registry_pause_ms: Option<u64>,
}

/// Resolved runtime configuration, constructed once at startup and
/// passed explicitly to everything that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned for newly-downloaded audio files.
    pub library_dir: PathBuf,
    /// SQLite database file holding the track documents.
    pub database_path: PathBuf,
    pub acoustid_api_key: String,
    pub stability_wait: Duration,
    pub registry_pause: Duration,
}

impl Config {
    /// Load configuration from the environment and the TOML file.
    pub fn load() -> Result<Self> {
        let toml_config = read_toml_config(config_file_path().as_deref())?;
        resolve(&toml_config)
    }
}

/// Config file location: `TRACKDEX_CONFIG` override, otherwise
/// `<config dir>/trackdex/config.toml`.
fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("TRACKDEX_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("trackdex").join("config.toml"))
}

/// Read the TOML config file; a missing file is not an error.
pub fn read_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        return Ok(TomlConfig::default());
    };
    if !path.exists() {
        return Ok(TomlConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config failed ({}): {}", path.display(), e)))
}

/// Resolve one string-valued setting: environment variable wins over
/// the TOML value, which wins over the default.
fn resolve_value(env_var: &str, toml_value: Option<String>, default: Option<String>) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    toml_value.filter(|v| !v.trim().is_empty()).or(default)
}

fn resolve(toml_config: &TomlConfig) -> Result<Config> {
    let library_dir = resolve_value(
        "TRACKDEX_LIBRARY_DIR",
        toml_config
            .library_dir
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        None,
    )
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("./downloads"));

    let database_path = resolve_value(
        "TRACKDEX_DATABASE",
        toml_config
            .database_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        None,
    )
    .map(PathBuf::from)
    .unwrap_or_else(default_database_path);

    let acoustid_api_key = resolve_value(
        "TRACKDEX_ACOUSTID_API_KEY",
        toml_config.acoustid_api_key.clone(),
        None,
    )
    .ok_or_else(|| {
        Error::Config(
            "AcoustID API key not configured. Configure one of:\n\
             1. Environment: TRACKDEX_ACOUSTID_API_KEY=your-key-here\n\
             2. TOML config: acoustid_api_key = \"your-key\"\n\
             \n\
             Obtain API key at: https://acoustid.org/api-key"
                .to_string(),
        )
    })?;

    let stability_wait_seconds = resolve_value(
        "TRACKDEX_STABILITY_WAIT_SECONDS",
        toml_config.stability_wait_seconds.map(|v| v.to_string()),
        None,
    )
    .map(|v| {
        v.parse::<u64>()
            .map_err(|_| Error::Config(format!("Invalid stability wait: {}", v)))
    })
    .transpose()?
    .unwrap_or(DEFAULT_STABILITY_WAIT_SECS);

    let registry_pause_ms = toml_config
        .registry_pause_ms
        .unwrap_or(DEFAULT_REGISTRY_PAUSE_MS);

    Ok(Config {
        library_dir,
        database_path,
        acoustid_api_key,
        stability_wait: Duration::from_secs(stability_wait_seconds),
        registry_pause: Duration::from_millis(registry_pause_ms),
    })
}

/// OS-dependent default database location, `<data dir>/trackdex/trackdex.db`.
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("trackdex").join("trackdex.db"))
        .unwrap_or_else(|| PathBuf::from("./trackdex.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_toml() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            library_dir = "/srv/downloads"
            database_path = "/srv/trackdex.db"
            acoustid_api_key = "abc123"
            stability_wait_seconds = 2
            registry_pause_ms = 1500
            "#,
        )
        .expect("valid toml");

        assert_eq!(toml_config.library_dir.as_deref(), Some(Path::new("/srv/downloads")));
        assert_eq!(toml_config.stability_wait_seconds, Some(2));
        assert_eq!(toml_config.registry_pause_ms, Some(1500));
    }

    #[test]
    fn resolves_toml_values_with_defaults_for_the_rest() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            library_dir = "/srv/downloads"
            acoustid_api_key = "abc123"
            "#,
        )
        .expect("valid toml");

        let config = resolve(&toml_config).expect("resolves");
        assert_eq!(config.library_dir, PathBuf::from("/srv/downloads"));
        assert_eq!(config.acoustid_api_key, "abc123");
        assert_eq!(
            config.stability_wait,
            Duration::from_secs(DEFAULT_STABILITY_WAIT_SECS)
        );
        assert_eq!(
            config.registry_pause,
            Duration::from_millis(DEFAULT_REGISTRY_PAUSE_MS)
        );
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let err = resolve(&TomlConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("AcoustID API key"));
    }

    #[test]
    fn env_overrides_toml() {
        let var = "TRACKDEX_TEST_RESOLVE_VALUE";
        std::env::set_var(var, "from-env");
        let resolved = resolve_value(var, Some("from-toml".to_string()), None);
        std::env::remove_var(var);
        assert_eq!(resolved.as_deref(), Some("from-env"));
    }

    #[test]
    fn blank_env_value_falls_through_to_toml() {
        let var = "TRACKDEX_TEST_RESOLVE_BLANK";
        std::env::set_var(var, "  ");
        let resolved = resolve_value(var, Some("from-toml".to_string()), None);
        std::env::remove_var(var);
        assert_eq!(resolved.as_deref(), Some("from-toml"));
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let toml_config =
            read_toml_config(Some(Path::new("/nonexistent/trackdex/config.toml")))
                .expect("missing file is not an error");
        assert!(toml_config.acoustid_api_key.is_none());
    }
}
