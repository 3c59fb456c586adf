use crate::error::ConfigError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::{
  env,
  fs,
  path::{Path, PathBuf},
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OverseerConfig {
  pub league_url: String,
  pub rotational_league: bool,
  pub mapchange_path: String,
  pub debug_level: i32,
  pub roll_call_delay_secs: f64,
  pub request_timeout_secs: u64,
  pub log_dir: String,
}

impl Default for OverseerConfig {
  fn default() -> Self {
    OverseerConfig {
      league_url: String::new(),
      rotational_league: false,
      mapchange_path: String::new(),
      debug_level: 0,
      roll_call_delay_secs: DEFAULT_ROLL_CALL_SECS,
      request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
      log_dir: String::new(),
    }
  }
}

impl OverseerConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.league_url.trim().is_empty() {
      return Err(ConfigError::MissingLeagueUrl);
    }
    if !(0..=MAX_DEBUG_LEVEL).contains(&self.debug_level) {
      return Err(ConfigError::InvalidDebugLevel(self.debug_level));
    }
    if self.rotational_league && self.mapchange_path.trim().is_empty() {
      return Err(ConfigError::MissingMapChangePath);
    }
    Ok(())
  }

  pub fn log_dir(&self) -> Option<PathBuf> {
    let trimmed = self.log_dir.trim();
    if trimmed.is_empty() {
      None
    } else {
      Some(PathBuf::from(trimmed))
    }
  }

  /// Debug level as the verbosity bucket used by `logging::debug_message`.
  pub fn verbosity(&self) -> u8 {
    self.debug_level.clamp(0, MAX_DEBUG_LEVEL) as u8
  }
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn parse_flag(raw: &str) -> bool {
  let value = raw.trim().to_ascii_lowercase();
  matches!(value.as_str(), "1" | "true" | "yes" | "on")
}

pub fn apply_env_defaults(mut config: OverseerConfig) -> OverseerConfig {
  if config.league_url.trim().is_empty() {
    if let Some(value) = env_default("LEAGUE_OVERSEER_URL") {
      config.league_url = value;
    }
  }
  if config.debug_level == 0 {
    if let Some(value) = env_default("LEAGUE_OVERSEER_DEBUG_LEVEL") {
      match value.parse::<i32>() {
        Ok(level) => config.debug_level = level,
        Err(_) => tracing::warn!(value = %value, "ignoring non-numeric LEAGUE_OVERSEER_DEBUG_LEVEL"),
      }
    }
  }
  if !config.rotational_league {
    if let Some(value) = env_default("LEAGUE_OVERSEER_ROTATIONAL") {
      config.rotational_league = parse_flag(&value);
    }
  }
  if config.mapchange_path.trim().is_empty() {
    if let Some(value) = env_default("LEAGUE_OVERSEER_MAPCHANGE_PATH") {
      config.mapchange_path = value;
    }
  }
  if config.log_dir.trim().is_empty() {
    if let Some(value) = env_default("LEAGUE_OVERSEER_LOG_DIR") {
      config.log_dir = value;
    }
  }
  config
}

pub fn parse_config(data: &str, path: &Path) -> Result<OverseerConfig, ConfigError> {
  serde_json::from_str::<OverseerConfig>(data).map_err(|source| ConfigError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Reads the JSON config (defaults when absent), fills blanks from the
/// environment and validates the result.
pub fn load_config(path: Option<&Path>) -> Result<OverseerConfig, ConfigError> {
  let config = match path {
    Some(path) if path.is_file() => {
      let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
      })?;
      parse_config(&data, path)?
    }
    _ => OverseerConfig::default(),
  };
  let config = apply_env_defaults(config);
  config.validate()?;
  Ok(config)
}

pub fn load_env_file(path: &Path) {
  if !path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.len() >= 2
    && ((value.starts_with('"') && value.ends_with('"'))
      || (value.starts_with('\'') && value.ends_with('\'')))
  {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

/// Name of the map being played, taken from the first line of the map
/// change file without its `.conf` suffix.
pub fn read_map_name(path: &Path) -> Result<String, ConfigError> {
  let data = fs::read_to_string(path).map_err(|source| ConfigError::MapChange {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(map_name_from_line(data.lines().next().unwrap_or("")))
}

pub fn map_name_from_line(line: &str) -> String {
  let trimmed = line.trim();
  trimmed.strip_suffix(".conf").unwrap_or(trimmed).to_string()
}
