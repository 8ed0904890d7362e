//! Persisted focus session models.
//!
//! `FocusState` is the canonical copy stored under `focusState`; `FocusStatePatch`
//! is the partial-merge payload accepted by the store.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Category;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusState {
    pub active: bool,
    pub allowed_contexts: BTreeSet<Category>,
    pub end_time: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub session_id: Option<String>,
}

impl FocusState {
    /// Applies a partial update field by field.
    ///
    /// Clearing `active` always clears `end_time` so an inactive state never
    /// carries a deadline.
    pub fn merge(&mut self, patch: FocusStatePatch) {
        if let Some(active) = patch.active {
            self.active = active;
        }
        if let Some(allowed) = patch.allowed_contexts {
            self.allowed_contexts = allowed;
        }
        if let Some(end_time) = patch.end_time {
            self.end_time = end_time;
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = started_at;
        }
        if let Some(session_id) = patch.session_id {
            self.session_id = session_id;
        }
        if !self.active {
            self.end_time = None;
        }
    }
}

/// `None` leaves a field untouched; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusStatePatch {
    pub active: Option<bool>,
    pub allowed_contexts: Option<BTreeSet<Category>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub session_id: Option<Option<String>>,
}

impl FocusStatePatch {
    pub fn started(
        allowed: BTreeSet<Category>,
        started_at: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        session_id: String,
    ) -> Self {
        Self {
            active: Some(true),
            allowed_contexts: Some(allowed),
            end_time: Some(end_time),
            started_at: Some(Some(started_at)),
            session_id: Some(Some(session_id)),
        }
    }

    /// The allow-list is kept so the next session can offer it again.
    pub fn ended() -> Self {
        Self {
            active: Some(false),
            allowed_contexts: None,
            end_time: Some(None),
            started_at: Some(None),
            session_id: Some(None),
        }
    }
}
