use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    classifier::parent_domain,
    models::{Category, FocusState},
    store::DomainMap,
};

use super::{BlockRule, HostCoverage};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
    /// Rule ceiling. The effective ceiling is also capped by the host.
    pub max_rules: usize,
    /// Splits a large category across rules to keep each regex short.
    pub max_domains_per_rule: usize,
    pub intercept_path: String,
    pub priority: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_rules: 5000,
            max_domains_per_rule: 100,
            intercept_path: "/intercept.html".into(),
            priority: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompileReport {
    pub rules: usize,
    pub blocked_categories: Vec<Category>,
    pub truncated: bool,
    pub dropped_domains: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledPolicy {
    pub rules: Vec<BlockRule>,
    pub report: CompileReport,
}

/// Builds the full rule set from a state snapshot. Deterministic: categories
/// in declaration order, domains sorted. A host is redirected exactly when
/// `DomainClassifier::classify_domain` puts it in a blocked category.
pub fn compile(
    state: &FocusState,
    domains: &DomainMap,
    config: &CompilerConfig,
    ceiling: usize,
) -> CompiledPolicy {
    if !state.active {
        return CompiledPolicy::default();
    }

    let is_blocked = |category: &Category| !state.allowed_contexts.contains(category);
    let blocked: Vec<Category> = Category::ALL
        .iter()
        .copied()
        .filter(|category| is_blocked(category))
        .collect();

    let mut grouped: BTreeMap<Category, Vec<String>> = BTreeMap::new();
    // Allowed entries sitting under a blocked two-label parent.
    let mut carve_outs: BTreeMap<Category, Vec<String>> = BTreeMap::new();
    for (domain, category) in domains {
        grouped.entry(*category).or_default().push(domain.clone());
        if is_blocked(category) {
            continue;
        }
        let parent_blocked = parent_domain(domain)
            .and_then(|parent| domains.get(&parent))
            .is_some_and(|parent_category| is_blocked(parent_category));
        if parent_blocked {
            carve_outs.entry(*category).or_default().push(domain.clone());
        }
    }

    let per_rule = config.max_domains_per_rule.max(1);
    let mut rules = Vec::new();
    let mut report = CompileReport {
        blocked_categories: blocked.clone(),
        ..Default::default()
    };

    // Exceptions go in first so a truncated policy loses blocking, never an exception.
    for (category, members) in &carve_outs {
        for chunk in members.chunks(per_rule) {
            if rules.len() >= ceiling {
                report.truncated = true;
                continue;
            }
            let id = (rules.len() + 1) as u32;
            rules.push(BlockRule::allowing(
                id,
                config.priority.saturating_add(1),
                *category,
                chunk.to_vec(),
            ));
        }
    }

    for category in &blocked {
        let Some(members) = grouped.get(category) else {
            continue;
        };
        let (wide, exact): (Vec<String>, Vec<String>) = members
            .iter()
            .cloned()
            .partition(|domain| HostCoverage::of(domain) == HostCoverage::WithSubdomains);

        for (coverage, group) in [
            (HostCoverage::WithSubdomains, wide),
            (HostCoverage::ExactHost, exact),
        ] {
            for chunk in group.chunks(per_rule) {
                if rules.len() >= ceiling {
                    report.truncated = true;
                    report.dropped_domains += chunk.len();
                    continue;
                }
                let id = (rules.len() + 1) as u32;
                rules.push(BlockRule::redirecting(
                    id,
                    config.priority,
                    *category,
                    chunk.to_vec(),
                    coverage,
                    &config.intercept_path,
                ));
            }
        }
    }

    report.rules = rules.len();
    CompiledPolicy { rules, report }
}
