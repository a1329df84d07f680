use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::cache::{StalePolicy, DEFAULT_STALE_TIME};

const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Priorities offered as tabs, in display order
  #[serde(default = "default_priorities")]
  pub priorities: Vec<String>,
  /// Priority selected on startup (defaults to the first of `priorities`)
  pub default_priority: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
  #[serde(default = "default_server_url")]
  pub url: String,
  /// Per-request timeout; unset means the HTTP client's default
  pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
  /// How long a fetched task list stays fresh
  #[serde(default = "default_stale_time_secs")]
  pub stale_time_secs: f64,
  /// What a read of stale data does: `return_stale` or `block`
  #[serde(default)]
  pub stale_policy: StalePolicy,
}

fn default_server_url() -> String {
  DEFAULT_SERVER_URL.to_string()
}

fn default_stale_time_secs() -> f64 {
  DEFAULT_STALE_TIME.as_secs_f64()
}

fn default_priorities() -> Vec<String> {
  ["High", "Medium", "Low"]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl Default for Config {
  fn default() -> Self {
    Self {
      server: ServerConfig::default(),
      cache: CacheConfig::default(),
      priorities: default_priorities(),
      default_priority: None,
    }
  }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      url: default_server_url(),
      request_timeout_secs: None,
    }
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time_secs: default_stale_time_secs(),
      stale_policy: StalePolicy::default(),
    }
  }
}

impl ServerConfig {
  pub fn request_timeout(&self) -> Option<Duration> {
    self.request_timeout_secs.map(Duration::from_secs)
  }
}

impl CacheConfig {
  /// The stale time as a `Duration`; fails for negative, non-finite or
  /// out-of-range values.
  pub fn stale_time(&self) -> Result<Duration> {
    Duration::try_from_secs_f64(self.stale_time_secs).map_err(|e| {
      eyre!(
        "cache.stale_time_secs must be a non-negative number of seconds, got {}: {}",
        self.stale_time_secs,
        e
      )
    })
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./taskq.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/taskq/config.yaml
  ///
  /// With no file found, defaults are used. `TASKQ_SERVER_URL` overrides
  /// `server.url` either way.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    if let Ok(url) = std::env::var("TASKQ_SERVER_URL") {
      config.server.url = url;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("taskq.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("taskq").join("config.yaml");
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
    // An empty file is valid and means "all defaults"
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Check values that deserialize fine but cannot work.
  pub fn validate(&self) -> Result<()> {
    self.server_url()?;

    if self.priorities.is_empty() {
      return Err(eyre!("At least one priority must be configured"));
    }

    if let Some(default) = &self.default_priority {
      if !self.priorities.contains(default) {
        return Err(eyre!(
          "default_priority '{}' is not one of the configured priorities: {}",
          default,
          self.priorities.join(", ")
        ));
      }
    }

    self.cache.stale_time()?;

    Ok(())
  }

  pub fn server_url(&self) -> Result<Url> {
    let url = Url::parse(&self.server.url)
      .map_err(|e| eyre!("Invalid server URL '{}': {}", self.server.url, e))?;

    match url.scheme() {
      "http" | "https" => Ok(url),
      other => Err(eyre!(
        "Server URL must use http or https, got '{}'",
        other
      )),
    }
  }

  /// The priority to show first.
  pub fn initial_priority(&self) -> &str {
    self
      .default_priority
      .as_deref()
      .or_else(|| self.priorities.first().map(String::as_str))
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;
  use tempfile::NamedTempFile;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.server.url, "http://localhost:3000");
    assert_eq!(config.cache.stale_time().unwrap(), Duration::from_secs(5));
    assert_eq!(config.cache.stale_policy, StalePolicy::ReturnStale);
    assert_eq!(config.priorities, vec!["High", "Medium", "Low"]);
    assert_eq!(config.initial_priority(), "High");
    assert!(config.server.request_timeout().is_none());
    config.validate().unwrap();
  }

  #[test]
  fn test_load_full_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
      file,
      r#"
server:
  url: http://tasks.internal:8080/api
  request_timeout_secs: 10
cache:
  stale_time_secs: 2.5
  stale_policy: block
priorities: [Urgent, Normal]
default_priority: Normal
"#
    )
    .unwrap();

    let config = Config::load_from_path(file.path()).unwrap();

    assert_eq!(config.server.url, "http://tasks.internal:8080/api");
    assert_eq!(config.server.request_timeout(), Some(Duration::from_secs(10)));
    assert_eq!(config.cache.stale_time().unwrap(), Duration::from_millis(2500));
    assert_eq!(config.cache.stale_policy, StalePolicy::Block);
    assert_eq!(config.initial_priority(), "Normal");
    config.validate().unwrap();
  }

  #[test]
  fn test_partial_file_uses_defaults() {
    let config = Config::parse("cache:\n  stale_time_secs: 30\n").unwrap();
    assert_eq!(config.server.url, "http://localhost:3000");
    assert_eq!(config.cache.stale_time().unwrap(), Duration::from_secs(30));
    assert_eq!(config.priorities.len(), 3);
  }

  #[test]
  fn test_empty_file_is_default() {
    let config = Config::parse("   \n").unwrap();
    assert_eq!(config.priorities, default_priorities());
  }

  #[test]
  fn test_unknown_field_is_rejected() {
    assert!(Config::parse("sever:\n  url: http://x\n").is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_validate_rejects_unknown_default_priority() {
    let config = Config {
      default_priority: Some("Critical".to_string()),
      ..Config::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_validate_rejects_empty_priorities() {
    let config = Config {
      priorities: Vec::new(),
      ..Config::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_validate_rejects_bad_urls() {
    let mut config = Config::default();
    config.server.url = "not a url".to_string();
    assert!(config.validate().is_err());

    config.server.url = "ftp://example.com".to_string();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_validate_rejects_negative_stale_time() {
    let mut config = Config::default();
    config.cache.stale_time_secs = -1.0;
    assert!(config.validate().is_err());

    config.cache.stale_time_secs = f64::NAN;
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_validate_rejects_out_of_range_stale_time() {
    let mut config = Config::default();
    config.cache.stale_time_secs = 1e20;

    assert!(config.validate().is_err());
    assert!(config.cache.stale_time().is_err());
  }

  #[test]
  fn test_out_of_range_stale_time_in_file_is_an_error() {
    let config = Config::parse("cache:\n  stale_time_secs: 1.0e20\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("stale_time_secs"));
  }
}
