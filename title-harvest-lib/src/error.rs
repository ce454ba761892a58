//! Error handling for title harvesting operations.
//!
//! Per-task failures (a page that could not be fetched) never escape a worker;
//! they are logged and counted. The remaining variants cover input and
//! configuration problems that the caller has to deal with.

use std::fmt;
use std::time::Duration;

/// Main error type for title harvesting operations.
#[derive(Debug, Clone)]
pub enum HarvestError {
    /// Transport failure or non-success HTTP status while fetching a page
    Fetch {
        url: String,
        message: String,
        status: Option<u16>,
    },

    /// The opt-in request timeout elapsed
    Timeout { url: String, duration: Duration },

    /// The task identifier is not something we can fetch
    InvalidUrl { url: String, reason: String },

    /// Configuration errors (invalid settings, unparsable files, etc.)
    Config { message: String },

    /// File I/O errors when reading URL lists or config files
    File { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl HarvestError {
    /// Create a new fetch error.
    pub fn fetch<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new fetch error carrying the HTTP status that caused it.
    pub fn fetch_with_status<U: Into<String>, M: Into<String>>(
        url: U,
        message: M,
        status: u16,
    ) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
            status: Some(status),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<U: Into<String>>(url: U, duration: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            duration,
        }
    }

    /// Create a new invalid URL error.
    pub fn invalid_url<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error is a per-task retrieval failure.
    ///
    /// Workers swallow these; everything else is a caller problem.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Timeout { .. } | Self::InvalidUrl { .. }
        )
    }
}

impl fmt::Display for HarvestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch {
                url,
                message,
                status,
            } => {
                if let Some(code) = status {
                    write!(f, "Fetch of '{}' failed (HTTP {}): {}", url, code, message)
                } else {
                    write!(f, "Fetch of '{}' failed: {}", url, message)
                }
            }
            Self::Timeout { url, duration } => {
                write!(f, "Timeout after {:?} fetching '{}'", duration, url)
            }
            Self::InvalidUrl { url, reason } => {
                write!(f, "Invalid URL '{}': {}", url, reason)
            }
            Self::Config { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::File { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for HarvestError {}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if let Some(status) = err.status() {
            Self::fetch_with_status(url, "unsuccessful status", status.as_u16())
        } else if err.is_connect() {
            Self::fetch(url, format!("connection failed: {}", err))
        } else {
            Self::fetch(url, err.to_string())
        }
    }
}

impl From<std::io::Error> for HarvestError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization failed: {}", err),
        }
    }
}
