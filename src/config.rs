//! Configuration loader and validator for the release tracker.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub tmdb: Tmdb,
    pub caldav: CalDav,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    /// Default proximity threshold in days.
    pub threshold_days: i64,
    /// Extra wait before an expedited dispatch scans the calendar.
    #[serde(default)]
    pub sync_grace_ms: u64,
}

/// Metadata service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tmdb {
    pub api_key: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Calendar server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalDav {
    pub server_url: String,
    pub username: String,
    pub password: String,
    /// Display name of the calendar to write into; the first one otherwise.
    #[serde(default)]
    pub calendar: Option<String>,
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_image_width() -> u32 {
    500
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "sqlite://{}/release-watch.db",
                self.app.data_dir.trim_end_matches('/')
            )
        })
    }

    pub fn sync_grace(&self) -> Duration {
        Duration::from_millis(self.app.sync_grace_ms)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    if cfg.tmdb.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("tmdb.api_key must be non-empty"));
    }
    if cfg.tmdb.image_width == 0 {
        return Err(ConfigError::Invalid("tmdb.image_width must be > 0"));
    }
    if let Some(base) = &cfg.tmdb.base_url {
        if reqwest::Url::parse(base).is_err() {
            return Err(ConfigError::Invalid("tmdb.base_url must be a valid URL"));
        }
    }

    if reqwest::Url::parse(&cfg.caldav.server_url).is_err() {
        return Err(ConfigError::Invalid("caldav.server_url must be a valid URL"));
    }
    if cfg.caldav.username.trim().is_empty() {
        return Err(ConfigError::Invalid("caldav.username must be non-empty"));
    }

    Ok(())
}

/// Example configuration document.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  threshold_days: 7
  sync_grace_ms: 3000

tmdb:
  api_key: "YOUR_TMDB_API_KEY"
  language: "en-US"
  image_width: 500

caldav:
  server_url: "https://caldav.example.com/"
  username: "me@example.com"
  password: "YOUR_APP_PASSWORD"
  calendar: "Releases"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.app.threshold_days, 7);
        assert_eq!(cfg.sync_grace(), Duration::from_millis(3000));
        assert_eq!(cfg.caldav.calendar.as_deref(), Some("Releases"));
    }

    #[test]
    fn defaults_fill_optional_keys() {
        let raw = r#"app:
  data_dir: "./data"
  threshold_days: 3
tmdb:
  api_key: "k"
caldav:
  server_url: "https://dav.example.org/"
  username: "u"
  password: "p"
"#;
        let cfg: Config = serde_yaml::from_str(raw).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.app.sync_grace_ms, 0);
        assert_eq!(cfg.tmdb.language, "en-US");
        assert_eq!(cfg.tmdb.image_width, 500);
        assert!(cfg.tmdb.base_url.is_none());
        assert!(cfg.caldav.calendar.is_none());
    }

    #[test]
    fn invalid_api_key() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.tmdb.api_key = "  ".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("tmdb.api_key")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_caldav_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.caldav.server_url = "not a url".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("server_url")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.caldav.username = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.tmdb.image_width = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.caldav.username, "me@example.com");
    }
}
