use serde::{Deserialize, Serialize};

/// Thresholds for the lost-focus signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DriftConfig {
    /// Switches into disallowed categories needed to flag lost focus.
    pub threshold: usize,

    /// Rolling window the switches are counted over.
    pub window_minutes: i64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            threshold: 3,
            window_minutes: 30,
        }
    }
}
