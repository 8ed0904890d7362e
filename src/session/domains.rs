use anyhow::Result;
use log::info;

use crate::{classifier::normalize_domain, models::Category};

use super::FocusController;

impl FocusController {
    pub async fn classify_domain(&self, domain: &str) -> Option<Category> {
        self.state.lock().await.classifier.classify_domain(domain)
    }

    /// Persists a user override, then waits for the policy rebuild so the
    /// caller can rely on the new rules once this returns.
    pub async fn record_override(&self, domain: &str, category: Category) -> Result<()> {
        let changed = {
            let mut guard = self.state.lock().await;
            let mut next = guard.classifier.clone();
            let changed = next.upsert(domain, category)?;
            if changed {
                self.repo.set_domain_map(next.map()).await?;
                guard.classifier = next;
            }
            changed
        };

        if changed {
            info!("Domain {} now classified as {category}", normalize_domain(domain));
            self.recompile_logged().await;
        }
        Ok(())
    }
}
