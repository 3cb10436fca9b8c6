//! Engine configuration, deserialised from an optional TOML file plus
//! `BONFIRE_*` environment overrides.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
  /// SQLite file holding bonfires and bindings. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path:              PathBuf,
  /// How often the sweeper looks for expired bonfires.
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs:     u64,
  /// Expiry timeout given to newly registered bonfires.
  #[serde(default = "default_time_until_destroy_secs")]
  pub time_until_destroy_secs: u64,
  /// Player cap for player-initiated binds. Operator `set` ignores it.
  #[serde(default)]
  pub max_players_per_bonfire: Option<u32>,
}

fn default_store_path() -> PathBuf { PathBuf::from("bonfire.db") }

fn default_sweep_interval_secs() -> u64 { 60 }

fn default_time_until_destroy_secs() -> u64 { 24 * 60 * 60 }

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      store_path:              default_store_path(),
      sweep_interval_secs:     default_sweep_interval_secs(),
      time_until_destroy_secs: default_time_until_destroy_secs(),
      max_players_per_bonfire: None,
    }
  }
}

impl EngineConfig {
  /// Read `path` (if it exists) and overlay `BONFIRE_*` environment
  /// variables, e.g. `BONFIRE_SWEEP_INTERVAL_SECS=30`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("BONFIRE").try_parsing(true))
      .build()?
      .try_deserialize()
  }

  /// Never zero; `tokio::time::interval` panics on a zero period.
  pub fn sweep_interval(&self) -> Duration {
    Duration::from_secs(self.sweep_interval_secs.max(1))
  }

  pub fn time_until_destroy(&self) -> Duration {
    Duration::from_secs(self.time_until_destroy_secs)
  }

  /// `store_path` with a leading `~/` expanded to the user's home directory.
  pub fn resolved_store_path(&self) -> PathBuf {
    let s = self.store_path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/")
      && let Ok(home) = std::env::var("HOME")
    {
      return PathBuf::from(home).join(rest);
    }
    self.store_path.clone()
  }
}
