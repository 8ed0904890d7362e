mod config;
mod detector;

pub use config::DriftConfig;
pub use detector::{DriftDetector, DriftStatus, DriftWarning};
