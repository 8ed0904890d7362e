use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{models::FocusState, store::DomainMap};

use super::{compile, CompileReport, CompilerConfig, EnforcementEngine};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStatus {
    /// False until a compile has been accepted by the host, and after any
    /// failed install.
    pub installed: bool,
    pub report: CompileReport,
    pub last_error: Option<String>,
}

/// Pushes compiled policies to the host, always as a full replacement.
#[derive(Clone)]
pub struct PolicySync {
    engine: Arc<dyn EnforcementEngine>,
    config: CompilerConfig,
    status: Arc<Mutex<PolicyStatus>>,
}

impl PolicySync {
    pub fn new(engine: Arc<dyn EnforcementEngine>, config: CompilerConfig) -> Self {
        Self {
            engine,
            config,
            status: Arc::new(Mutex::new(PolicyStatus::default())),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.config.max_rules.min(self.engine.max_rules())
    }

    pub async fn status(&self) -> PolicyStatus {
        self.status.lock().await.clone()
    }

    pub async fn apply(&self, state: &FocusState, domains: &DomainMap) -> Result<CompileReport> {
        let compiled = compile(state, domains, &self.config, self.ceiling());
        let report = compiled.report.clone();

        if report.truncated {
            log_warn!(
                "policy truncated at {} rules; {} domains left unenforced",
                report.rules,
                report.dropped_domains
            );
        }

        let result = self.install(compiled.rules).await;
        let mut status = self.status.lock().await;
        match result {
            Ok(()) => {
                log_info!(
                    "installed {} block rules for {} blocked categories",
                    report.rules,
                    if state.active { report.blocked_categories.len() } else { 0 }
                );
                *status = PolicyStatus {
                    installed: true,
                    report: report.clone(),
                    last_error: None,
                };
                Ok(report)
            }
            Err(err) => {
                log_error!("policy install failed: {err:#}");
                *status = PolicyStatus {
                    installed: false,
                    report,
                    last_error: Some(format!("{err:#}")),
                };
                Err(err)
            }
        }
    }

    async fn install(&self, rules: Vec<super::BlockRule>) -> Result<()> {
        let installed = self
            .engine
            .installed_rule_ids()
            .await
            .context("failed to list installed rules")?;
        self.engine
            .update_rules(installed, rules)
            .await
            .context("failed to replace installed rules")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::Category, policy::InMemoryEngine};

    fn active_state() -> FocusState {
        FocusState {
            active: true,
            allowed_contexts: [Category::Work].into_iter().collect(),
            ..Default::default()
        }
    }

    fn domains() -> DomainMap {
        DomainMap::from([
            ("youtube.com".to_string(), Category::Entertainment),
            ("reddit.com".to_string(), Category::Social),
        ])
    }

    #[tokio::test]
    async fn replaces_previous_rules_wholesale() {
        let engine = Arc::new(InMemoryEngine::default());
        let sync = PolicySync::new(engine.clone(), CompilerConfig::default());

        sync.apply(&active_state(), &domains()).await.unwrap();
        sync.apply(&active_state(), &domains()).await.unwrap();
        assert_eq!(engine.rules().await.len(), 2);

        sync.apply(&FocusState::default(), &domains()).await.unwrap();
        assert!(engine.rules().await.is_empty());
        assert_eq!(engine.update_count(), 3);
    }

    #[tokio::test]
    async fn failed_install_is_not_authoritative() {
        let engine = Arc::new(InMemoryEngine::default());
        let sync = PolicySync::new(engine.clone(), CompilerConfig::default());

        engine.fail_installs(true);
        assert!(sync.apply(&active_state(), &domains()).await.is_err());
        let status = sync.status().await;
        assert!(!status.installed);
        assert!(status.last_error.is_some());

        engine.fail_installs(false);
        sync.apply(&active_state(), &domains()).await.unwrap();
        assert!(sync.status().await.installed);
        assert!(engine.matching_rule("https://youtube.com/").await.is_some());
    }

    #[tokio::test]
    async fn ceiling_respects_host_maximum() {
        let engine = Arc::new(InMemoryEngine::new(1));
        let sync = PolicySync::new(engine.clone(), CompilerConfig::default());

        let report = sync.apply(&active_state(), &domains()).await.unwrap();
        assert_eq!(report.rules, 1);
        assert!(report.truncated);
        assert_eq!(engine.rules().await.len(), 1);
    }
}
