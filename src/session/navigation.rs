use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::{
    classifier::host_of,
    drift::DriftStatus,
    effects::{intercept_url, Effect},
    models::{Category, ContentClassification, ContextHistoryEntry},
};

use super::{
    controller::{ControllerState, TabContext},
    state::is_blocked,
    FocusController,
};

/// What the host should do with a main-frame navigation.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationDecision {
    pub category: Option<Category>,
    pub blocked: bool,
    pub redirect_url: Option<String>,
}

impl NavigationDecision {
    fn allow(category: Option<Category>) -> Self {
        Self {
            category,
            blocked: false,
            redirect_url: None,
        }
    }
}

impl FocusController {
    /// Classifies a committed navigation and redirects it when blocked.
    /// Installed rules normally catch these first; this covers pages that
    /// were already open when the session started.
    pub async fn on_navigation(&self, tab_id: u32, url: &str) -> NavigationDecision {
        let Some(host) = host_of(url) else {
            return NavigationDecision::allow(None);
        };
        let now = self.clock.now();
        let mut guard = self.state.lock().await;
        let category = guard.classifier.classify_domain(&host);
        self.observe_locked(&mut guard, tab_id, url, category, now)
    }

    /// Takes the content classifier's verdict for a page. Confident verdicts
    /// are learned into the domain map and override the table.
    pub async fn on_content_classified(
        &self,
        tab_id: u32,
        url: &str,
        classification: ContentClassification,
    ) -> Result<NavigationDecision> {
        let Some(host) = host_of(url) else {
            return Ok(NavigationDecision::allow(None));
        };
        let now = self.clock.now();
        let threshold = self.settings.learn_confidence_threshold;
        let confident =
            classification.confidence.is_finite() && classification.confidence >= threshold;

        let entry = ContextHistoryEntry {
            context: classification.primary_context,
            url: url.to_string(),
            timestamp: now,
            confidence: classification.confidence,
        };
        if let Err(err) = self.repo.push_history(entry).await {
            warn!("Failed to record context history: {err:#}");
        }

        let (decision, learned) = {
            let mut guard = self.state.lock().await;
            let mut learned = false;
            if confident
                && guard.classifier.classify_domain(&host) != Some(classification.primary_context)
            {
                let mut next = guard.classifier.clone();
                if next.learn(&host, &classification, threshold) {
                    self.repo.set_domain_map(next.map()).await?;
                    guard.classifier = next;
                    learned = true;
                }
            }

            let category = if confident {
                Some(classification.primary_context)
            } else {
                guard.classifier.classify_domain(&host)
            };
            (
                self.observe_locked(&mut guard, tab_id, url, category, now),
                learned,
            )
        };

        if learned {
            debug!("Learned {host} as {}", classification.primary_context);
            self.recompile_logged().await;
        }
        Ok(decision)
    }

    fn observe_locked(
        &self,
        guard: &mut ControllerState,
        tab_id: u32,
        url: &str,
        category: Option<Category>,
        now: DateTime<Utc>,
    ) -> NavigationDecision {
        guard.tabs.insert(
            tab_id,
            TabContext {
                category,
                url: url.to_string(),
            },
        );

        if guard.focus.active {
            if let Some(category) = category {
                guard.drift.observe(category, url, now);
                let allowed = guard.focus.allowed_contexts.clone();
                if let Some(warning) = guard.drift.escalation(now, &allowed) {
                    self.outbox.emit(Effect::DriftWarning {
                        level: warning.level,
                        switches: warning.switches,
                    });
                }
            }
        }

        match category {
            Some(category) if is_blocked(&guard.focus, Some(category)) => {
                self.mark_recently_blocked(guard);
                let redirect = intercept_url(&self.settings.policy.intercept_path, url, category);
                self.outbox.emit(Effect::RedirectNow {
                    tab_id,
                    url: redirect.clone(),
                });
                NavigationDecision {
                    category: Some(category),
                    blocked: true,
                    redirect_url: Some(redirect),
                }
            }
            _ => NavigationDecision::allow(category),
        }
    }

    pub async fn tab_closed(&self, tab_id: u32) {
        self.state.lock().await.tabs.remove(&tab_id);
    }

    pub async fn tab_category(&self, tab_id: u32) -> Option<Category> {
        self.state
            .lock()
            .await
            .tabs
            .get(&tab_id)
            .and_then(|tab| tab.category)
    }

    pub async fn drift_status(&self) -> DriftStatus {
        let now = self.clock.now();
        let mut guard = self.state.lock().await;
        let allowed = guard.focus.allowed_contexts.clone();
        guard.drift.status(now, &allowed)
    }
}
