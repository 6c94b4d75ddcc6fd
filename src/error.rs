//! Error types.
//!
//! Dispatch misses and patches against elements without an instance are not
//! errors; they are silent no-ops. The types here cover the few operations
//! that can genuinely fail: loading behavior scripts, parsing markup into the
//! in-memory host, and reading configuration.

use std::path::PathBuf;

use thiserror::Error;

/// A behavior script could not be fetched or executed.
///
/// Cloned once per waiter when several callers share one in-flight load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The host reported a failure while injecting the script.
    #[error("failed to load script {url}: {reason}")]
    Failed {
        /// Source URL of the script.
        url: String,
        /// Host-provided reason.
        reason: String,
    },
}

impl LoadError {
    /// Build a failure for `url`.
    pub fn failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Source URL the failure belongs to.
    pub fn url(&self) -> &str {
        match self {
            Self::Failed { url, .. } => url,
        }
    }
}

/// Malformed input handed to [`MemoryDom::parse`](crate::dom::MemoryDom::parse).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("unclosed comment starting at byte {0}")]
    UnclosedComment(usize),

    #[error("empty tag name at byte {0}")]
    EmptyTagName(usize),

    #[error("unclosed start tag <{0}>")]
    UnclosedStartTag(String),

    #[error("unclosed end tag starting at byte {0}")]
    UnclosedEndTag(usize),

    #[error("unclosed quoted value for attribute `{0}`")]
    UnclosedAttribute(String),

    #[error("unexpected closing tag </{0}>")]
    UnexpectedClose(String),
}

/// Configuration could not be read or parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid runtime config: {0}")]
    Parse(#[from] toml::de::Error),
}
