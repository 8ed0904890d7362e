use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, ContextSwitchEvent};

use super::DriftConfig;

/// Hard cap on retained switches regardless of the window.
const MAX_TRACKED_SWITCHES: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriftStatus {
    pub is_lost_focus: bool,
    pub context_switches: usize,
    pub current_streak: u32,
    pub current_context: Option<Category>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftWarning {
    /// 1 at the threshold, +1 per further offending switch in the window.
    pub level: u32,
    pub switches: usize,
}

#[derive(Debug)]
pub struct DriftDetector {
    config: DriftConfig,
    switches: VecDeque<ContextSwitchEvent>,
    current: Option<(Category, String)>,
    streak: u32,
    warned_level: u32,
}

impl DriftDetector {
    pub fn new(config: DriftConfig) -> Self {
        Self {
            config,
            switches: VecDeque::new(),
            current: None,
            streak: 0,
            warned_level: 0,
        }
    }

    fn window(&self) -> Duration {
        Duration::minutes(self.config.window_minutes.max(0))
    }

    /// Feeds one classification. Returns the switch it produced, if any.
    pub fn observe(
        &mut self,
        category: Category,
        url: &str,
        now: DateTime<Utc>,
    ) -> Option<ContextSwitchEvent> {
        match self.current.take() {
            Some((previous, _)) if previous == category => {
                self.streak = self.streak.saturating_add(1);
                self.current = Some((category, url.to_string()));
                None
            }
            Some((previous, previous_url)) => {
                let event = self.record_switch_at(previous, category, &previous_url, url, now);
                self.current = Some((category, url.to_string()));
                self.streak = 1;
                Some(event)
            }
            None => {
                self.current = Some((category, url.to_string()));
                self.streak = 1;
                None
            }
        }
    }

    pub fn record_switch_at(
        &mut self,
        from: Category,
        to: Category,
        from_url: &str,
        to_url: &str,
        timestamp: DateTime<Utc>,
    ) -> ContextSwitchEvent {
        let event = ContextSwitchEvent {
            from,
            to,
            timestamp,
            from_url: from_url.to_string(),
            to_url: to_url.to_string(),
        };
        self.switches.push_back(event.clone());
        while self.switches.len() > MAX_TRACKED_SWITCHES {
            self.switches.pop_front();
        }
        event
    }

    fn evict(&mut self, now: DateTime<Utc>) {
        let window = self.window();
        while let Some(oldest) = self.switches.front() {
            if now - oldest.timestamp > window {
                self.switches.pop_front();
            } else {
                break;
            }
        }
    }

    fn offending(&self, allowed: &BTreeSet<Category>) -> usize {
        self.switches
            .iter()
            .filter(|event| !allowed.contains(&event.to))
            .count()
    }

    pub fn status(&mut self, now: DateTime<Utc>, allowed: &BTreeSet<Category>) -> DriftStatus {
        self.evict(now);
        DriftStatus {
            is_lost_focus: self.config.threshold > 0
                && self.offending(allowed) >= self.config.threshold,
            context_switches: self.switches.len(),
            current_streak: self.streak,
            current_context: self.current.as_ref().map(|(category, _)| *category),
        }
    }

    /// Returns a warning only when the level rises above the last one raised.
    /// The level re-arms once the window drains below the threshold.
    pub fn escalation(
        &mut self,
        now: DateTime<Utc>,
        allowed: &BTreeSet<Category>,
    ) -> Option<DriftWarning> {
        self.evict(now);
        let offending = self.offending(allowed);
        let threshold = self.config.threshold;
        if threshold == 0 || offending < threshold {
            self.warned_level = 0;
            return None;
        }

        let level = (offending - threshold + 1) as u32;
        if level > self.warned_level {
            self.warned_level = level;
            Some(DriftWarning {
                level,
                switches: offending,
            })
        } else {
            None
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &ContextSwitchEvent> {
        self.switches.iter()
    }

    pub fn reset(&mut self) {
        self.switches.clear();
        self.current = None;
        self.streak = 0;
        self.warned_level = 0;
    }
}
