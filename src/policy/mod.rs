//! Compiles the allow-list and domain map into host block rules.
//!
//! Every recompile is a full rebuild from the latest snapshot, installed as
//! one remove-all-then-add call.

mod compiler;
mod engine;
mod rule;
mod sync;

pub use compiler::{compile, CompileReport, CompiledPolicy, CompilerConfig};
pub use engine::{EnforcementEngine, InMemoryEngine};
pub use rule::{
    domain_pattern, winning_redirect, ActionType, BlockRule, HostCoverage, Redirect, ResourceType,
    RuleAction, RuleCondition,
};
pub use sync::{PolicyStatus, PolicySync};
