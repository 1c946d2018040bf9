//! Error types for the FRM companion core
//!
//! The timing subsystem itself never fails: every anomaly degrades to
//! "no metric this cycle". Errors only arise when configuring it.

use thiserror::Error;

/// Result type alias for companion operations
pub type Result<T> = std::result::Result<T, CompanionError>;

/// Main error type for companion operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompanionError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
