use std::path::PathBuf;

use thiserror::Error;

/// Setup-time failures: bad configuration, malformed request specs, or a
/// transport that cannot be constructed. Per-call failures never use this
/// type; they travel as [`crate::http::response::Failure`] data instead.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid request path `{0}`: paths must start with `/`")]
    InvalidPath(String),

    #[error("Unbound placeholder `{{{{{name}}}}}` in `{template}`")]
    UnboundPlaceholder { name: String, template: String },

    #[error("Invalid header name `{key}`: {reason}")]
    InvalidHeaderName { key: String, reason: String },

    #[error("Invalid header value for `{key}`: {reason}")]
    InvalidHeaderValue { key: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file `{path}`: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
