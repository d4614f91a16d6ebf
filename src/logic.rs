//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Recording a scored assessment (XP derivation + engine + store write)
//!   - The optimistic-concurrency retry loop around read-compute-write
//!   - Read-only progress lookup and idempotent user registration

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{ProgressSummary, UserProgress};
use crate::engine::{apply_progress, ProgressError};
use crate::state::AppState;
use crate::store::StoreError;

/// XP credited per point of assessment score.
pub const XP_PER_POINT: i64 = 10;

/// Bound on read-compute-write retries when concurrent events for the same
/// user keep invalidating our snapshot.
const WRITE_RETRY_LIMIT: u32 = 8;

#[derive(Debug, Error)]
pub enum RecordError {
  #[error(transparent)]
  Progress(#[from] ProgressError),
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error("score {score} exceeds total {total}")]
  ScoreExceedsTotal { score: i64, total: i64 },
  #[error("gave up recording result for user {user_id} after {attempts} version conflicts")]
  RetriesExhausted { user_id: String, attempts: u32 },
}

/// XP delta for a scored assessment. A negative score is a contract violation
/// by the caller and is rejected outright — clamping it to zero would forge
/// the earned-XP audit trail.
pub fn xp_for_score(score: i64) -> Result<u32, ProgressError> {
  let gained = score
    .checked_mul(XP_PER_POINT)
    .ok_or(ProgressError::XpGainOutOfRange(score))?;
  if gained < 0 {
    return Err(ProgressError::NegativeXpGain(gained));
  }
  u32::try_from(gained).map_err(|_| ProgressError::XpGainOutOfRange(gained))
}

/// Apply one completed, scored assessment to the user's progress record.
///
/// The cycle is read snapshot -> pure engine -> conditional write. When the
/// write loses a version race against a concurrent event for the same user,
/// the whole cycle is retried against a fresh snapshot, so no XP gain can be
/// silently overwritten. `now` is taken once by the caller and injected.
#[instrument(level = "info", skip(state), fields(%user_id, score, total))]
pub async fn record_result(
  state: &AppState,
  user_id: &str,
  score: i64,
  total: i64,
  now: DateTime<Utc>,
) -> Result<(UserProgress, ProgressSummary), RecordError> {
  if score > total {
    return Err(RecordError::ScoreExceedsTotal { score, total });
  }
  let xp_gained = xp_for_score(score)?;

  for attempt in 1..=WRITE_RETRY_LIMIT {
    let snapshot = state.store.read(user_id).await?;
    let (updated, summary) = apply_progress(&snapshot.progress, xp_gained, now)?;
    match state.store.write(user_id, updated.clone(), snapshot.version).await {
      Ok(version) => {
        info!(
          target: "progress",
          %user_id,
          xp = updated.xp,
          level = updated.level,
          streak = updated.streak,
          leveled_up = summary.leveled_up,
          version,
          "result recorded"
        );
        return Ok((updated, summary));
      }
      Err(StoreError::VersionConflict { .. }) => {
        warn!(target: "progress", %user_id, attempt, "version conflict; re-reading snapshot");
      }
      Err(e) => return Err(e.into()),
    }
  }

  Err(RecordError::RetriesExhausted {
    user_id: user_id.to_string(),
    attempts: WRITE_RETRY_LIMIT,
  })
}

/// Read-only projection of a user's progress (dashboard view).
#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn fetch_progress(state: &AppState, user_id: &str) -> Result<UserProgress, StoreError> {
  Ok(state.store.read(user_id).await?.progress)
}

/// Idempotently create a progress record. A missing id mints a fresh UUID,
/// mirroring how the external user-management subsystem would allocate one.
#[instrument(level = "info", skip(state))]
pub async fn register_user(
  state: &AppState,
  requested_id: Option<String>,
) -> (String, UserProgress, bool) {
  let user_id = requested_id
    .filter(|s| !s.trim().is_empty())
    .unwrap_or_else(|| Uuid::new_v4().to_string());
  let created = state.store.register(&user_id).await;
  let progress = state
    .store
    .read(&user_id)
    .await
    .map(|rec| rec.progress)
    .unwrap_or_default();
  info!(target: "progress", %user_id, created, "user registration handled");
  (user_id, progress, created)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
  }

  #[test]
  fn xp_derivation_is_ten_per_point() {
    assert_eq!(xp_for_score(0).unwrap(), 0);
    assert_eq!(xp_for_score(7).unwrap(), 70);
  }

  #[test]
  fn negative_score_is_rejected_not_clamped() {
    assert_eq!(xp_for_score(-3).unwrap_err(), ProgressError::NegativeXpGain(-30));
  }

  #[test]
  fn absurd_score_is_rejected() {
    assert!(matches!(
      xp_for_score(i64::MAX / 2).unwrap_err(),
      ProgressError::XpGainOutOfRange(_)
    ));
  }

  #[tokio::test]
  async fn record_result_for_unknown_user_fails() {
    let state = AppState::empty();
    let err = record_result(&state, "ghost", 5, 10, at(2026, 8, 28, 12))
      .await
      .unwrap_err();
    assert!(matches!(err, RecordError::Store(StoreError::UnknownUser(_))));
  }

  #[tokio::test]
  async fn record_result_rejects_score_above_total() {
    let state = AppState::empty();
    state.store.register("u1").await;
    let err = record_result(&state, "u1", 11, 10, at(2026, 8, 28, 12))
      .await
      .unwrap_err();
    assert!(matches!(err, RecordError::ScoreExceedsTotal { .. }));
  }

  #[tokio::test]
  async fn first_result_creates_day_one_streak() {
    let state = AppState::empty();
    state.store.register("u1").await;
    let (progress, summary) = record_result(&state, "u1", 3, 10, at(2026, 8, 28, 12))
      .await
      .unwrap();
    assert_eq!(progress.xp, 30);
    assert_eq!(progress.level, 1);
    assert_eq!(progress.streak, 1);
    assert_eq!(summary.xp_gained, 30);
    assert!(!summary.leveled_up);
  }

  #[tokio::test]
  async fn same_day_results_add_xp_but_not_streak() {
    let state = AppState::empty();
    state.store.register("u1").await;
    record_result(&state, "u1", 6, 10, at(2026, 8, 28, 9)).await.unwrap();
    let (progress, summary) = record_result(&state, "u1", 6, 10, at(2026, 8, 28, 15))
      .await
      .unwrap();
    assert_eq!(progress.xp, 120);
    assert_eq!(progress.level, 2);
    assert_eq!(progress.streak, 1);
    assert!(summary.leveled_up);
  }

  #[tokio::test]
  async fn daily_results_grow_the_streak() {
    let state = AppState::empty();
    state.store.register("u1").await;
    for day in 1..=5 {
      record_result(&state, "u1", 2, 10, at(2026, 9, day, 18)).await.unwrap();
    }
    let progress = fetch_progress(&state, "u1").await.unwrap();
    assert_eq!(progress.streak, 5);
    assert_eq!(progress.xp, 100);
    assert_eq!(progress.level, 2);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_results_lose_no_xp() {
    let state = AppState::empty();
    state.store.register("u1").await;
    let now = at(2026, 8, 28, 12);

    let mut handles = Vec::new();
    for _ in 0..6 {
      let state = state.clone();
      handles.push(tokio::spawn(async move {
        record_result(&state, "u1", 2, 10, now).await
      }));
    }
    for h in handles {
      h.await.unwrap().unwrap();
    }

    // Every event's gain survives; same-day events never inflate the streak.
    let progress = fetch_progress(&state, "u1").await.unwrap();
    assert_eq!(progress.xp, 120);
    assert_eq!(progress.level, 2);
    assert_eq!(progress.streak, 1);
  }

  #[tokio::test]
  async fn register_user_mints_id_when_absent() {
    let state = AppState::empty();
    let (id, progress, created) = register_user(&state, None).await;
    assert!(Uuid::parse_str(&id).is_ok());
    assert!(created);
    assert_eq!(progress, UserProgress::default());

    let (same_id, _, created_again) = register_user(&state, Some(id.clone())).await;
    assert_eq!(same_id, id);
    assert!(!created_again);
  }
}
