//! Focus session lifecycle and the block decision.

mod controller;
mod domains;
mod navigation;
mod state;

pub use controller::{FocusController, FocusStatus};
pub use navigation::NavigationDecision;
pub use state::{has_expired, is_blocked, time_left_secs, SessionPhase};
