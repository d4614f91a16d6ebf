//! Application state: the progress store plus startup import logic.
//!
//! This module owns:
//!   - building the initial record map from the TOML bank (if any)
//!   - inserting built-in demo seeds without overwriting bank entries
//!   - validating imported records before they ever reach the engine
//!
//! The engine fails fast on malformed records, so corrupt bank entries are
//! rejected here at import time with an error log instead of being normalized.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};

use crate::config::{load_progress_config_from_env, UserCfg};
use crate::domain::{level_for_xp, UserProgress};
use crate::seeds::seed_users;
use crate::store::{ProgressStore, VersionedProgress};

#[derive(Clone)]
pub struct AppState {
    pub store: ProgressStore,
}

impl AppState {
    /// Build state from env: load the optional TOML bank, validate entries,
    /// add demo seeds, and wrap everything in the live store.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg_opt = load_progress_config_from_env();

        let mut records = HashMap::<String, VersionedProgress>::new();
        let mut from_bank = 0usize;

        if let Some(cfg) = &cfg_opt {
            for uc in &cfg.users {
                let Some(progress) = record_from_cfg(uc) else {
                    continue;
                };
                if records.contains_key(&uc.id) {
                    error!(target: "progress", id = %uc.id, "Skipping bank item: duplicate user id.");
                    continue;
                }
                records.insert(uc.id.clone(), VersionedProgress::initial(progress));
                from_bank += 1;
            }
        }

        // Always insert built-in seeds, but don't overwrite bank entries.
        let mut from_seed = 0usize;
        for (id, progress) in seed_users() {
            records
                .entry(id)
                .or_insert_with(|| {
                    from_seed += 1;
                    VersionedProgress::initial(progress)
                });
        }

        info!(
            target: "progress",
            bank = from_bank,
            seed = from_seed,
            total = records.len(),
            "Startup user inventory"
        );

        Self {
            store: ProgressStore::with_records(records),
        }
    }

    /// State with no users at all. Test entry point.
    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            store: ProgressStore::default(),
        }
    }
}

/// Validate one bank entry into a progress record. Invalid entries are
/// logged and dropped, never silently repaired.
fn record_from_cfg(uc: &UserCfg) -> Option<UserProgress> {
    let last_active = match &uc.last_active {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                error!(target: "progress", id = %uc.id, raw = %raw, error = %e, "Skipping bank item: bad last_active timestamp.");
                return None;
            }
        },
        None => None,
    };

    // Streak and activity must agree: a streak implies a timestamp and a
    // timestamp implies a streak of at least one.
    if last_active.is_none() && uc.streak > 0 {
        error!(target: "progress", id = %uc.id, streak = uc.streak, "Skipping bank item: streak without last_active.");
        return None;
    }
    if last_active.is_some() && uc.streak == 0 {
        error!(target: "progress", id = %uc.id, "Skipping bank item: last_active without streak.");
        return None;
    }

    Some(UserProgress {
        xp: uc.xp,
        level: level_for_xp(uc.xp),
        streak: uc.streak,
        last_active,
    })
}
