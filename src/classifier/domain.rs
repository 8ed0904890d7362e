use crate::{
    error::FocusError,
    models::{Category, ContentClassification},
    store::DomainMap,
};

use super::{normalize_domain, parent_domain, table::BUILTIN_DOMAINS};

/// Domain → category lookup. At most one category per domain; last write wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainClassifier {
    map: DomainMap,
}

impl DomainClassifier {
    pub fn with_builtins() -> Self {
        let map = BUILTIN_DOMAINS
            .iter()
            .map(|(domain, category)| (domain.to_string(), *category))
            .collect();
        Self { map }
    }

    /// Built-in table overlaid with persisted entries.
    pub fn from_persisted(persisted: DomainMap) -> Self {
        let mut classifier = Self::with_builtins();
        for (domain, category) in persisted {
            classifier.map.insert(normalize_domain(&domain), category);
        }
        classifier
    }

    pub fn map(&self) -> &DomainMap {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Exact match, then without `www.`, then the last two labels.
    /// Never guesses beyond that; `None` means "unknown", not "blocked".
    pub fn classify_domain(&self, domain: &str) -> Option<Category> {
        let lowered = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        if lowered.is_empty() {
            return None;
        }

        if let Some(category) = self.map.get(&lowered) {
            return Some(*category);
        }

        let stripped = lowered.strip_prefix("www.").unwrap_or(&lowered);
        if stripped != lowered {
            if let Some(category) = self.map.get(stripped) {
                return Some(*category);
            }
        }

        parent_domain(stripped).and_then(|parent| self.map.get(&parent).copied())
    }

    /// Returns whether the map changed.
    pub fn upsert(&mut self, domain: &str, category: Category) -> Result<bool, FocusError> {
        let key = normalize_domain(domain);
        if key.is_empty() || key.contains(&['/', ' '][..]) {
            return Err(FocusError::InvalidDomain(domain.to_string()));
        }
        Ok(self.map.insert(key, category) != Some(category))
    }

    /// Adopts the content classifier's label once it is confident enough.
    pub fn learn(
        &mut self,
        domain: &str,
        classification: &ContentClassification,
        threshold: f64,
    ) -> bool {
        if !classification.confidence.is_finite() || classification.confidence < threshold {
            return false;
        }
        self.upsert(domain, classification.primary_context)
            .unwrap_or(false)
    }
}
