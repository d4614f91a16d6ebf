//! Domain models for the gamification core: the user progress record, the
//! per-event summary, and the level derivation rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// XP needed per level (simple linear curve: level 1 starts at 0 XP).
pub const LEVEL_THRESHOLD: u64 = 100;

/// Level implied by a total XP amount. Level is always derived from XP,
/// never stored independently, so the two cannot drift.
pub fn level_for_xp(xp: u64) -> u32 {
  (xp / LEVEL_THRESHOLD) as u32 + 1
}

/// Gamification slice of a user record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
  pub xp: u64,
  pub level: u32,
  /// Consecutive calendar days with at least one qualifying activity.
  /// Once any activity exists this is >= 1; a missed-day reset goes back
  /// to 1, never 0.
  pub streak: u32,
  /// Most recent qualifying activity, or None for a never-active user.
  pub last_active: Option<DateTime<Utc>>,
}

impl Default for UserProgress {
  /// State of a freshly created user: no XP, level 1, no activity yet.
  fn default() -> Self {
    Self { xp: 0, level: 1, streak: 0, last_active: None }
  }
}

/// Human-relevant outcome of one applied activity event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
  pub xp_gained: u32,
  pub leveled_up: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn level_formula_boundaries() {
    assert_eq!(level_for_xp(0), 1);
    assert_eq!(level_for_xp(99), 1);
    assert_eq!(level_for_xp(100), 2);
    assert_eq!(level_for_xp(199), 2);
    assert_eq!(level_for_xp(200), 3);
    assert_eq!(level_for_xp(1000), 11);
  }

  #[test]
  fn default_record_is_fresh() {
    let p = UserProgress::default();
    assert_eq!(p.xp, 0);
    assert_eq!(p.level, 1);
    assert_eq!(p.streak, 0);
    assert!(p.last_active.is_none());
  }
}
