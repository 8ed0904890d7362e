use std::{
    collections::HashSet,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{winning_redirect, BlockRule};

/// Host-side declarative rule table.
#[async_trait]
pub trait EnforcementEngine: Send + Sync {
    /// Documented maximum number of dynamic rules.
    fn max_rules(&self) -> usize;

    async fn installed_rule_ids(&self) -> Result<Vec<u32>>;

    /// Removes then adds in one atomic step. Either all of it applies or none.
    async fn update_rules(&self, remove_rule_ids: Vec<u32>, add_rules: Vec<BlockRule>) -> Result<()>;
}

/// Rule table kept in process memory.
pub struct InMemoryEngine {
    rules: Mutex<Vec<BlockRule>>,
    max_rules: usize,
    fail_installs: AtomicBool,
    updates: AtomicUsize,
}

impl InMemoryEngine {
    pub fn new(max_rules: usize) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            max_rules,
            fail_installs: AtomicBool::new(false),
            updates: AtomicUsize::new(0),
        }
    }

    pub fn fail_installs(&self, fail: bool) {
        self.fail_installs.store(fail, Ordering::SeqCst);
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub async fn rules(&self) -> Vec<BlockRule> {
        self.rules.lock().await.clone()
    }

    /// Installed rule that would redirect a top-level navigation to `url`.
    pub async fn matching_rule(&self, url: &str) -> Option<BlockRule> {
        winning_redirect(&self.rules.lock().await, url).cloned()
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new(5000)
    }
}

#[async_trait]
impl EnforcementEngine for InMemoryEngine {
    fn max_rules(&self) -> usize {
        self.max_rules
    }

    async fn installed_rule_ids(&self) -> Result<Vec<u32>> {
        Ok(self.rules.lock().await.iter().map(|rule| rule.id).collect())
    }

    async fn update_rules(&self, remove_rule_ids: Vec<u32>, add_rules: Vec<BlockRule>) -> Result<()> {
        if self.fail_installs.load(Ordering::SeqCst) {
            bail!("rule installation rejected by host");
        }

        let mut rules = self.rules.lock().await;
        let removing: HashSet<u32> = remove_rule_ids.into_iter().collect();
        let mut next: Vec<BlockRule> = rules
            .iter()
            .filter(|rule| !removing.contains(&rule.id))
            .cloned()
            .collect();

        let mut ids: HashSet<u32> = next.iter().map(|rule| rule.id).collect();
        for rule in &add_rules {
            if !ids.insert(rule.id) {
                bail!("duplicate rule id {}", rule.id);
            }
        }
        next.extend(add_rules);
        if next.len() > self.max_rules {
            bail!(
                "rule count {} exceeds host maximum {}",
                next.len(),
                self.max_rules
            );
        }

        *rules = next;
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
