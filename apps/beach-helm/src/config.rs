use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::backoff::{BackoffPolicy, DEFAULT_RECONNECT_DELAYS_MS};
use crate::handlers::{DEFAULT_HIGHLIGHT_MS, DEFAULT_HOVER_MS, HandlerSettings};

pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8787/helm";
pub const DEFAULT_LOG_FILTER: &str = "info,beach_helm=debug";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid reconnect delays `{raw}`: {reason}")]
    InvalidDelays { raw: String, reason: String },
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("invalid {variable} `{raw}`: {reason}")]
    InvalidDuration {
        variable: &'static str,
        raw: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmConfig {
    pub endpoint: String,
    pub reconnect_delays_ms: Vec<u64>,
    pub log_filter: String,
    pub document_path: Option<PathBuf>,
    pub highlight_duration_ms: u64,
    pub hover_duration_ms: u64,
}

impl Default for HelmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            reconnect_delays_ms: DEFAULT_RECONNECT_DELAYS_MS.to_vec(),
            log_filter: DEFAULT_LOG_FILTER.into(),
            document_path: None,
            highlight_duration_ms: DEFAULT_HIGHLIGHT_MS,
            hover_duration_ms: DEFAULT_HOVER_MS,
        }
    }
}

impl HelmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source; `from_env` passes
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let endpoint = lookup("BEACH_HELM_ENDPOINT").unwrap_or(defaults.endpoint);
        let reconnect_delays_ms = match lookup("BEACH_HELM_RECONNECT_DELAYS_MS") {
            Some(raw) => parse_delays(&raw)?,
            None => defaults.reconnect_delays_ms,
        };
        let log_filter = lookup("RUST_LOG").unwrap_or(defaults.log_filter);
        let document_path = lookup("BEACH_HELM_DOCUMENT")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let highlight_duration_ms = match lookup("BEACH_HELM_HIGHLIGHT_MS") {
            Some(raw) => parse_duration_ms("BEACH_HELM_HIGHLIGHT_MS", &raw)?,
            None => defaults.highlight_duration_ms,
        };
        let hover_duration_ms = match lookup("BEACH_HELM_HOVER_MS") {
            Some(raw) => parse_duration_ms("BEACH_HELM_HOVER_MS", &raw)?,
            None => defaults.hover_duration_ms,
        };
        Ok(Self {
            endpoint,
            reconnect_delays_ms,
            log_filter,
            document_path,
            highlight_duration_ms,
            hover_duration_ms,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_url()?;
        if let Some(position) = self.reconnect_delays_ms.iter().position(|ms| *ms == 0) {
            return Err(ConfigError::InvalidDelays {
                raw: join_delays(&self.reconnect_delays_ms),
                reason: format!("entry {position} is zero"),
            });
        }
        Ok(())
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let url = Url::parse(&self.endpoint).map_err(|err| invalid(err.to_string()))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(invalid(format!("unsupported scheme `{other}`"))),
        }
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::from_millis(&self.reconnect_delays_ms)
    }

    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            highlight_duration: Duration::from_millis(self.highlight_duration_ms),
            hover_duration: Duration::from_millis(self.hover_duration_ms),
        }
    }
}

/// Parses a comma-separated list of millisecond delays. Blank input yields an
/// empty list, which the backoff policy treats as "use the defaults".
pub fn parse_delays(raw: &str) -> Result<Vec<u64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<u64>().map_err(|err| ConfigError::InvalidDelays {
                raw: raw.to_string(),
                reason: format!("`{entry}`: {err}"),
            })
        })
        .collect()
}

fn parse_duration_ms(variable: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|err| ConfigError::InvalidDuration {
            variable,
            raw: raw.to_string(),
            reason: err.to_string(),
        })
}

fn join_delays(delays: &[u64]) -> String {
    delays
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
