use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_TTL_SECS;
use crate::queue::DEFAULT_MAX_ATTEMPTS;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub remote: RemoteConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  /// Base URL of the data service (e.g. "https://xyz.supabase.co")
  pub url: String,
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Namespace isolating this application's keys in the store
  #[serde(default = "default_namespace")]
  pub namespace: String,
  #[serde(default = "default_ttl_secs")]
  pub default_ttl_secs: u64,
  /// Database file (defaults to $XDG_DATA_HOME/station-sync/store.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      namespace: default_namespace(),
      default_ttl_secs: default_ttl_secs(),
      path: None,
    }
  }
}

fn default_namespace() -> String {
  "nipco-station-manager".to_string()
}

fn default_ttl_secs() -> u64 {
  DEFAULT_TTL_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Failed replays before an operation is dead-lettered
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
  /// Queue every write instead of contacting the remote store
  #[serde(default)]
  pub offline: bool,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      max_attempts: default_max_attempts(),
      offline: false,
    }
  }
}

fn default_max_attempts() -> u32 {
  DEFAULT_MAX_ATTEMPTS
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./station-sync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/station-sync/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/station-sync/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("station-sync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("station-sync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  /// Get the data service API key from environment variables.
  ///
  /// Checks STATION_SYNC_API_KEY first, then SUPABASE_ANON_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    std::env::var("STATION_SYNC_API_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .map_err(|_| {
        eyre!(
          "API key not found. Set STATION_SYNC_API_KEY or SUPABASE_ANON_KEY environment variable."
        )
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse("remote:\n  url: https://example.supabase.co\n").unwrap();
    assert_eq!(config.remote.timeout_secs, 30);
    assert_eq!(config.cache.namespace, "nipco-station-manager");
    assert_eq!(config.cache.default_ttl_secs, 3600);
    assert_eq!(config.sync.max_attempts, 5);
    assert!(!config.sync.offline);
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
remote:
  url: https://example.supabase.co
  timeout_secs: 5
cache:
  namespace: depot-2
  default_ttl_secs: 60
  path: /tmp/store.db
sync:
  max_attempts: 2
  offline: true
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.cache.namespace, "depot-2");
    assert_eq!(config.cache.path, Some(PathBuf::from("/tmp/store.db")));
    assert_eq!(config.sync.max_attempts, 2);
    assert!(config.sync.offline);
  }

  #[test]
  fn test_missing_remote_is_an_error() {
    assert!(Config::parse("cache:\n  namespace: x\n").is_err());
  }

  #[test]
  fn test_explicit_missing_path_is_an_error() {
    let err = Config::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
