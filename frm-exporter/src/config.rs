//! Exporter configuration, validated from the command line.

use std::time::Duration;

use frm_companion::{CompanionError, TimingConfig};

/// Validated exporter configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    /// Port the metrics server listens on
    pub port: u16,
    /// FRM web server base addresses to poll
    pub frm_addresses: Vec<String>,
    /// Session label attached to every metric
    pub session_name: String,
    /// Time between polls of each address
    pub poll_interval: Duration,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Train timing configuration
    pub timing: TimingConfig,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            port: 9000,
            frm_addresses: vec!["http://localhost:8080".to_string()],
            session_name: "default".to_string(),
            poll_interval: Duration::from_secs(15),
            request_timeout: Duration::from_millis(5_000),
            timing: TimingConfig::default(),
        }
    }
}

impl ExporterConfig {
    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ExporterError> {
        if self.frm_addresses.is_empty() {
            return Err(ExporterError::InvalidConfig(
                "at least one FRM address is required".to_string(),
            ));
        }
        if let Some(address) = self
            .frm_addresses
            .iter()
            .find(|a| !(a.starts_with("http://") || a.starts_with("https://")))
        {
            return Err(ExporterError::InvalidConfig(format!(
                "FRM address must start with http:// or https://: {address}"
            )));
        }
        if self.session_name.trim().is_empty() {
            return Err(ExporterError::InvalidConfig(
                "session name must be non-empty".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ExporterError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ExporterError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        self.timing.validate()?;
        Ok(())
    }
}

/// Exporter startup errors.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Timing(#[from] CompanionError),

    #[error(transparent)]
    Fetch(#[from] crate::fetch::FetchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
