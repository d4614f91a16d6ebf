//! Loading the progress configuration (optional initial user bank) from TOML.
//!
//! See `ProgressConfig` and `UserCfg` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ProgressConfig {
  #[serde(default)]
  pub users: Vec<UserCfg>,
}

/// Initial user record accepted in TOML configuration.
///
/// Level is intentionally absent: it is always derived from `xp` at import
/// time so a hand-edited bank can never ship a drifted level.
#[derive(Clone, Debug, Deserialize)]
pub struct UserCfg {
  pub id: String,
  #[serde(default)]
  pub xp: u64,
  #[serde(default)]
  pub streak: u32,
  /// RFC 3339 timestamp of the last qualifying activity, if any.
  #[serde(default)]
  pub last_active: Option<String>,
}

/// Attempt to load `ProgressConfig` from PROGRESS_CONFIG_PATH. On any
/// parsing/IO error, returns None.
pub fn load_progress_config_from_env() -> Option<ProgressConfig> {
  let path = std::env::var("PROGRESS_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<ProgressConfig>(&s) {
      Ok(cfg) => {
        info!(target: "prepdeck_backend", %path, "Loaded progress config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "prepdeck_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "prepdeck_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_user_bank() {
    let cfg: ProgressConfig = toml::from_str(
      r#"
        [[users]]
        id = "ava"
        xp = 240
        streak = 4
        last_active = "2026-08-27T21:15:00Z"

        [[users]]
        id = "ben"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.users.len(), 2);
    assert_eq!(cfg.users[0].id, "ava");
    assert_eq!(cfg.users[0].xp, 240);
    assert_eq!(cfg.users[0].streak, 4);
    assert!(cfg.users[0].last_active.is_some());
    assert_eq!(cfg.users[1].xp, 0);
    assert!(cfg.users[1].last_active.is_none());
  }
}
