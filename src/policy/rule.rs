use regex::Regex;
use serde::Serialize;

use crate::models::Category;

/// One declarative rule in the host's dynamic rule shape.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
    #[serde(skip)]
    pub category: Category,
    #[serde(skip)]
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Redirect,
    Allow,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    pub extension_path: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub regex_filter: String,
    pub resource_types: Vec<ResourceType>,
}

/// Only top-level navigations are ever matched.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
}

/// Which hosts a listed domain stands for. Mirrors the classifier lookup:
/// a two-label domain also answers for every host beneath it, anything
/// longer only for itself and its `www.` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCoverage {
    WithSubdomains,
    ExactHost,
}

impl HostCoverage {
    pub fn of(domain: &str) -> Self {
        if domain.split('.').count() == 2 {
            HostCoverage::WithSubdomains
        } else {
            HostCoverage::ExactHost
        }
    }
}

/// Anchored http(s) filter for `domains`. Userinfo and a port are allowed;
/// lookalikes that merely end with the same letters are not.
pub fn domain_pattern(domains: &[String], coverage: HostCoverage) -> String {
    let alternation = domains
        .iter()
        .map(|domain| regex::escape(domain))
        .collect::<Vec<_>>()
        .join("|");
    let prefix = match coverage {
        HostCoverage::WithSubdomains => r"([^/?#@]*\.)?",
        HostCoverage::ExactHost => r"(www\.)?",
    };
    format!(r"^https?://([^/?#@]*@)?{prefix}({alternation})(:\d+)?([/?#]|$)")
}

impl BlockRule {
    pub fn redirecting(
        id: u32,
        priority: u32,
        category: Category,
        domains: Vec<String>,
        coverage: HostCoverage,
        intercept_path: &str,
    ) -> Self {
        Self {
            id,
            priority,
            action: RuleAction {
                kind: ActionType::Redirect,
                redirect: Some(Redirect {
                    extension_path: intercept_path.to_string(),
                }),
            },
            condition: RuleCondition {
                regex_filter: domain_pattern(&domains, coverage),
                resource_types: vec![ResourceType::MainFrame],
            },
            category,
            domains,
        }
    }

    /// Carve-out for hosts whose own entry is allowed while a broader
    /// redirect rule would catch them.
    pub fn allowing(id: u32, priority: u32, category: Category, domains: Vec<String>) -> Self {
        Self {
            id,
            priority,
            action: RuleAction {
                kind: ActionType::Allow,
                redirect: None,
            },
            condition: RuleCondition {
                regex_filter: domain_pattern(&domains, HostCoverage::ExactHost),
                resource_types: vec![ResourceType::MainFrame],
            },
            category,
            domains,
        }
    }

    pub fn is_redirect(&self) -> bool {
        self.action.kind == ActionType::Redirect
    }

    /// Evaluates the rule's filter against a top-level URL.
    pub fn matches(&self, url: &str) -> bool {
        Regex::new(&self.condition.regex_filter)
            .map(|filter| filter.is_match(&url.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

/// The redirect that wins for `url`: highest priority among matching rules,
/// with allow beating redirect on a tie. `None` when an allow rule wins.
pub fn winning_redirect<'a>(rules: &'a [BlockRule], url: &str) -> Option<&'a BlockRule> {
    let top = rules
        .iter()
        .filter(|rule| rule.matches(url))
        .max_by_key(|rule| (rule.priority, !rule.is_redirect()))?;
    top.is_redirect().then_some(top)
}
