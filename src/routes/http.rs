//! HTTP endpoint handlers. These are thin wrappers that forward to core logic
//! and translate its error taxonomy into status codes.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use chrono::Utc;
use tracing::{info, instrument};

use crate::engine::ProgressError;
use crate::logic::{fetch_progress, record_result, register_user, RecordError};
use crate::protocol::*;
use crate::state::AppState;
use crate::store::StoreError;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_register_user(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RegisterIn>,
) -> impl IntoResponse {
  let (user_id, progress, created) = register_user(&state, body.user_id).await;
  let status = if created { StatusCode::CREATED } else { StatusCode::OK };
  (status, Json(RegisterOut { user_id, progress, created }))
}

#[instrument(level = "info", skip(state), fields(%q.user_id))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ProgressQuery>,
) -> Result<Json<ProgressOut>, (StatusCode, Json<ErrorOut>)> {
  let progress = fetch_progress(&state, &q.user_id)
    .await
    .map_err(store_error_response)?;
  Ok(Json(ProgressOut { user_id: q.user_id, progress }))
}

#[instrument(
  level = "info",
  skip(state, body),
  fields(%body.user_id, score = body.score, total = body.total)
)]
pub async fn http_post_result(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ResultIn>,
) -> Result<Json<ResultOut>, (StatusCode, Json<ErrorOut>)> {
  // The processing time is pinned once here and injected, so the whole
  // retry cycle evaluates against one day boundary.
  let now = Utc::now();
  let (progress, summary) = record_result(&state, &body.user_id, body.score, body.total, now)
    .await
    .map_err(record_error_response)?;
  info!(
    target: "progress",
    user_id = %body.user_id,
    assessment_id = body.assessment_id.as_deref().unwrap_or("-"),
    xp_gained = summary.xp_gained,
    leveled_up = summary.leveled_up,
    "HTTP result recorded"
  );
  Ok(Json(ResultOut { progress, summary }))
}

fn store_error_response(e: StoreError) -> (StatusCode, Json<ErrorOut>) {
  let status = match &e {
    StoreError::UnknownUser(_) => StatusCode::NOT_FOUND,
    StoreError::VersionConflict { .. } => StatusCode::CONFLICT,
  };
  (status, Json(ErrorOut { error: e.to_string() }))
}

fn record_error_response(e: RecordError) -> (StatusCode, Json<ErrorOut>) {
  let status = match &e {
    RecordError::Store(StoreError::UnknownUser(_)) => StatusCode::NOT_FOUND,
    RecordError::Store(StoreError::VersionConflict { .. }) => StatusCode::CONFLICT,
    RecordError::RetriesExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
    RecordError::ScoreExceedsTotal { .. }
    | RecordError::Progress(ProgressError::NegativeXpGain(_))
    | RecordError::Progress(ProgressError::XpGainOutOfRange(_)) => StatusCode::UNPROCESSABLE_ENTITY,
    // Corrupt stored records are a server-side invariant failure.
    RecordError::Progress(_) => StatusCode::INTERNAL_SERVER_ERROR,
  };
  (status, Json(ErrorOut { error: e.to_string() }))
}
