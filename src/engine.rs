//! The progress engine: applies one XP-earning activity event to a user's
//! gamification state.
//!
//! The engine is a pure calculation: no clock access, no I/O, no store
//! handles. The processing time is injected as `now`, so day-boundary
//! behavior is fully deterministic under test. All calendar comparisons use
//! UTC dates; the day boundary must live in exactly one zone or streak math
//! becomes environment-dependent.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::domain::{level_for_xp, ProgressSummary, UserProgress};

/// Precondition violations: the caller handed the engine a record or delta it
/// is never supposed to see. These are programming errors upstream, so the
/// engine fails fast instead of coercing — clamping a bad value would corrupt
/// the audit trail of earned XP.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
  #[error("xp gain must be non-negative, got {0}")]
  NegativeXpGain(i64),
  #[error("xp gain {0} is out of range")]
  XpGainOutOfRange(i64),
  #[error("stored level {level} does not match xp {xp}")]
  LevelDrift { xp: u64, level: u32 },
  #[error("streak {streak} recorded for a user with no activity timestamp")]
  StreakWithoutActivity { streak: u32 },
  #[error("activity timestamp present but streak is 0")]
  ActivityWithoutStreak,
  #[error("last_active day {last} is after the processing day {today}")]
  LastActiveInFuture { last: NaiveDate, today: NaiveDate },
}

/// Where the last activity sits relative to `today`, in UTC calendar days.
#[derive(Debug, PartialEq, Eq)]
enum DayRelation {
  SameDay,
  PreviousDay,
  Gap,
}

fn relate_days(last: NaiveDate, today: NaiveDate) -> DayRelation {
  if last == today {
    DayRelation::SameDay
  } else if last.succ_opt() == Some(today) {
    DayRelation::PreviousDay
  } else {
    DayRelation::Gap
  }
}

fn check_preconditions(current: &UserProgress, today: NaiveDate) -> Result<(), ProgressError> {
  if current.level != level_for_xp(current.xp) {
    return Err(ProgressError::LevelDrift { xp: current.xp, level: current.level });
  }
  match current.last_active {
    None if current.streak >= 1 => {
      Err(ProgressError::StreakWithoutActivity { streak: current.streak })
    }
    Some(_) if current.streak == 0 => Err(ProgressError::ActivityWithoutStreak),
    // The engine always stamps last_active with its own processing time, so a
    // record from a later day than `now` means corruption or a caller bug.
    Some(ts) if ts.date_naive() > today => Err(ProgressError::LastActiveInFuture {
      last: ts.date_naive(),
      today,
    }),
    _ => Ok(()),
  }
}

/// Apply one qualifying activity event to `current` and return the updated
/// record plus a summary for the caller to surface.
///
/// Streak rules, evaluated against UTC calendar days:
///   - never active before        -> 1
///   - last active today          -> unchanged (same-day events don't inflate)
///   - last active yesterday      -> +1
///   - two or more days missed    -> reset to 1 (returning always counts as
///     day one, never zero)
///
/// XP is additive and level is re-derived from the new total; `last_active`
/// always becomes `now`.
pub fn apply_progress(
  current: &UserProgress,
  xp_gained: u32,
  now: DateTime<Utc>,
) -> Result<(UserProgress, ProgressSummary), ProgressError> {
  let today = now.date_naive();
  check_preconditions(current, today)?;

  let new_streak = match current.last_active {
    None => 1,
    Some(last) => match relate_days(last.date_naive(), today) {
      DayRelation::SameDay => current.streak,
      DayRelation::PreviousDay => current.streak + 1,
      DayRelation::Gap => 1,
    },
  };

  let new_xp = current.xp + u64::from(xp_gained);
  let new_level = level_for_xp(new_xp);

  let updated = UserProgress {
    xp: new_xp,
    level: new_level,
    streak: new_streak,
    last_active: Some(now),
  };
  let summary = ProgressSummary {
    xp_gained,
    leveled_up: new_level > current.level,
  };
  Ok((updated, summary))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
  }

  fn active(xp: u64, streak: u32, last_active: DateTime<Utc>) -> UserProgress {
    UserProgress {
      xp,
      level: level_for_xp(xp),
      streak,
      last_active: Some(last_active),
    }
  }

  #[test]
  fn first_ever_activity_starts_streak_at_one() {
    let now = at(2026, 8, 28, 12);
    let (updated, summary) = apply_progress(&UserProgress::default(), 30, now).unwrap();
    assert_eq!(updated.streak, 1);
    assert_eq!(updated.xp, 30);
    assert_eq!(updated.level, 1);
    assert_eq!(updated.last_active, Some(now));
    assert!(!summary.leveled_up);
  }

  #[test]
  fn same_day_activity_keeps_streak() {
    let earlier = at(2026, 8, 28, 8);
    let later = at(2026, 8, 28, 20);
    let (updated, summary) = apply_progress(&active(50, 2, earlier), 20, later).unwrap();
    assert_eq!(updated.streak, 2);
    assert_eq!(updated.xp, 70);
    assert_eq!(updated.level, 1);
    assert_eq!(updated.last_active, Some(later));
    assert!(!summary.leveled_up);
  }

  #[test]
  fn consecutive_day_increments_streak() {
    let yesterday = at(2026, 8, 27, 23);
    let now = at(2026, 8, 28, 1);
    let (updated, _) = apply_progress(&active(10, 4, yesterday), 0, now).unwrap();
    assert_eq!(updated.streak, 5);
  }

  #[test]
  fn gap_resets_streak_to_one() {
    let three_days_ago = at(2026, 8, 25, 10);
    let now = at(2026, 8, 28, 10);
    let (updated, _) = apply_progress(&active(500, 7, three_days_ago), 10, now).unwrap();
    assert_eq!(updated.streak, 1);
  }

  #[test]
  fn month_boundary_counts_as_consecutive() {
    let last = at(2026, 8, 31, 22);
    let now = at(2026, 9, 1, 6);
    let (updated, _) = apply_progress(&active(0, 1, last), 10, now).unwrap();
    assert_eq!(updated.streak, 2);
  }

  #[test]
  fn level_up_at_threshold() {
    let yesterday = at(2026, 8, 27, 9);
    let now = at(2026, 8, 28, 9);
    let (updated, summary) = apply_progress(&active(95, 3, yesterday), 10, now).unwrap();
    assert_eq!(updated.xp, 105);
    assert_eq!(updated.level, 2);
    assert_eq!(updated.streak, 4);
    assert_eq!(updated.last_active, Some(now));
    assert_eq!(summary.xp_gained, 10);
    assert!(summary.leveled_up);
  }

  #[test]
  fn leveled_up_exactly_when_threshold_crossed() {
    let now = at(2026, 8, 28, 12);
    let last = at(2026, 8, 28, 8);
    // 90 + 9 = 99: still level 1.
    let (_, s) = apply_progress(&active(90, 1, last), 9, now).unwrap();
    assert!(!s.leveled_up);
    // 90 + 10 = 100: crosses into level 2.
    let (_, s) = apply_progress(&active(90, 1, last), 10, now).unwrap();
    assert!(s.leveled_up);
    // Already past the boundary: 100 + 50 = 150 stays level 2.
    let (_, s) = apply_progress(&active(100, 1, last), 50, now).unwrap();
    assert!(!s.leveled_up);
    // Jumping two levels at once still reports a single level-up.
    let (u, s) = apply_progress(&active(0, 1, last), 250, now).unwrap();
    assert_eq!(u.level, 3);
    assert!(s.leveled_up);
  }

  #[test]
  fn zero_gain_still_updates_streak_and_last_active() {
    let yesterday = at(2026, 8, 27, 12);
    let now = at(2026, 8, 28, 12);
    let (updated, summary) = apply_progress(&active(40, 2, yesterday), 0, now).unwrap();
    assert_eq!(updated.xp, 40);
    assert_eq!(updated.streak, 3);
    assert_eq!(updated.last_active, Some(now));
    assert_eq!(summary.xp_gained, 0);
  }

  #[test]
  fn deterministic_over_identical_inputs() {
    let state = active(120, 5, at(2026, 8, 27, 7));
    let now = at(2026, 8, 28, 7);
    let a = apply_progress(&state, 35, now).unwrap();
    let b = apply_progress(&state, 35, now).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn rejects_level_drift() {
    let state = UserProgress {
      xp: 250,
      level: 1, // should be 3
      streak: 1,
      last_active: Some(at(2026, 8, 28, 8)),
    };
    let err = apply_progress(&state, 10, at(2026, 8, 28, 9)).unwrap_err();
    assert_eq!(err, ProgressError::LevelDrift { xp: 250, level: 1 });
  }

  #[test]
  fn rejects_streak_without_activity() {
    let state = UserProgress {
      xp: 0,
      level: 1,
      streak: 3,
      last_active: None,
    };
    let err = apply_progress(&state, 10, at(2026, 8, 28, 9)).unwrap_err();
    assert_eq!(err, ProgressError::StreakWithoutActivity { streak: 3 });
  }

  #[test]
  fn rejects_activity_without_streak() {
    let state = UserProgress {
      xp: 10,
      level: 1,
      streak: 0,
      last_active: Some(at(2026, 8, 28, 8)),
    };
    let err = apply_progress(&state, 10, at(2026, 8, 28, 9)).unwrap_err();
    assert_eq!(err, ProgressError::ActivityWithoutStreak);
  }

  #[test]
  fn rejects_last_active_in_the_future() {
    let state = active(10, 1, at(2026, 8, 30, 8));
    let err = apply_progress(&state, 10, at(2026, 8, 28, 9)).unwrap_err();
    assert!(matches!(err, ProgressError::LastActiveInFuture { .. }));
  }

  #[test]
  fn future_same_day_is_fine() {
    // Clock skew within the same UTC day is tolerated; only a later calendar
    // day is treated as corruption.
    let state = active(10, 1, at(2026, 8, 28, 20));
    let (updated, _) = apply_progress(&state, 5, at(2026, 8, 28, 9)).unwrap();
    assert_eq!(updated.streak, 1);
  }
}
