//! Seed data: built-in demo accounts so the API is usable with no config.

use crate::domain::UserProgress;

/// Fresh demo accounts. They start with the default record; activity and
/// streaks accrue once results are submitted against them.
pub fn seed_users() -> Vec<(String, UserProgress)> {
  vec![
    ("demo".into(), UserProgress::default()),
    ("demo-interviewer".into(), UserProgress::default()),
  ]
}
