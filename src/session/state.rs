use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, FocusState};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "status")]
pub enum SessionPhase {
    Inactive,
    Active { end_time: Option<DateTime<Utc>> },
}

impl SessionPhase {
    pub fn of(state: &FocusState) -> Self {
        if state.active {
            SessionPhase::Active {
                end_time: state.end_time,
            }
        } else {
            SessionPhase::Inactive
        }
    }
}

/// Pure block decision. Unclassified activity is never blocked.
pub fn is_blocked(state: &FocusState, category: Option<Category>) -> bool {
    if !state.active {
        return false;
    }
    match category {
        Some(category) => !state.allowed_contexts.contains(&category),
        None => false,
    }
}

/// Whole seconds left, 0 when inactive or unlimited. Never negative.
pub fn time_left_secs(state: &FocusState, now: DateTime<Utc>) -> u64 {
    match (state.active, state.end_time) {
        (true, Some(end_time)) => (end_time - now).num_seconds().max(0) as u64,
        _ => 0,
    }
}

pub fn has_expired(state: &FocusState, now: DateTime<Utc>) -> bool {
    matches!((state.active, state.end_time), (true, Some(end_time)) if end_time <= now)
}
