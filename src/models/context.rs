use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Category;

/// One observed move from one category to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextSwitchEvent {
    pub from: Category,
    pub to: Category,
    pub timestamp: DateTime<Utc>,
    pub from_url: String,
    pub to_url: String,
}

/// Entry of the persisted `contextHistory` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextHistoryEntry {
    pub context: Category,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
}

/// Output of the external content classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentClassification {
    pub primary_context: Category,
    pub confidence: f64,
    #[serde(default)]
    pub secondary_contexts: Vec<Category>,
}

/// A link set aside during a session. Owned by the park-list collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParkedLink {
    pub url: String,
    pub title: Option<String>,
    pub context: Category,
    pub timestamp: DateTime<Utc>,
}
