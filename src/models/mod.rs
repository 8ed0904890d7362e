pub mod category;
pub mod context;
pub mod session;

pub use category::Category;
pub use context::{ContentClassification, ContextHistoryEntry, ContextSwitchEvent, ParkedLink};
pub use session::{FocusState, FocusStatePatch};
