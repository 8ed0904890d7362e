use thiserror::Error;

/// Inputs rejected at the core boundary.
///
/// Storage and install failures travel as `anyhow::Error` with context
/// attached at the failing call.
#[derive(Debug, Error, PartialEq)]
pub enum FocusError {
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
    #[error("duration must be a positive number of minutes, got {0}")]
    InvalidDuration(f64),
    #[error("could not parse a domain from '{0}'")]
    InvalidDomain(String),
}
