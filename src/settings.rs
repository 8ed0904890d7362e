use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::{drift::DriftConfig, policy::CompilerConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusSettings {
    /// Expiry check period. The host cannot schedule below ~60s.
    pub expiry_check_secs: u64,
    /// How long the "recently blocked" indicator stays lit.
    pub blocked_cooldown_secs: u64,
    /// Content classifications at or above this confidence are learned per domain.
    pub learn_confidence_threshold: f64,
    pub history_cap: usize,
    pub drift: DriftConfig,
    pub policy: CompilerConfig,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            expiry_check_secs: 60,
            blocked_cooldown_secs: 30,
            learn_confidence_threshold: 0.7,
            history_cap: 100,
            drift: DriftConfig::default(),
            policy: CompilerConfig::default(),
        }
    }
}

impl FocusSettings {
    /// `FOCUS_GUARD_DEBUG=1` shortens the maintenance tick to one second.
    pub fn apply_env(mut self) -> Self {
        let debug_mode = std::env::var("FOCUS_GUARD_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.expiry_check_secs = 1;
        }
        self
    }
}

/// Settings file loaded once at startup. The host owns edits to the file.
pub struct SettingsStore {
    data: FocusSettings,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring invalid settings file {}: {err}; using defaults",
                    path.display()
                );
                FocusSettings::default()
            })
        } else {
            FocusSettings::default()
        };

        Ok(Self { data })
    }

    pub fn settings(&self) -> FocusSettings {
        self.data.clone()
    }
}
