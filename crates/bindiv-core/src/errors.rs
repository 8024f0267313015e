//! Structured error types shared across bindiv crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`BindivError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, labels, pair identifiers).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for bindiv studies.
///
/// Per-pair failures never surface through this type; they are classified
/// into pair statuses and carried in the study report instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum BindivError {
    /// Missing or unreadable variant roots, empty catalogs.
    #[error("discovery error: {0}")]
    Discovery(ErrorInfo),
    /// External diffing tool could not be run.
    #[error("tool invocation error: {0}")]
    ToolInvocation(ErrorInfo),
    /// Structured result or log text could not be interpreted.
    #[error("result parse error: {0}")]
    ResultParse(ErrorInfo),
    /// Invalid observations or malformed aggregation input.
    #[error("aggregation error: {0}")]
    Aggregation(ErrorInfo),
    /// Matrix construction or embedding preconditions.
    #[error("embedding error: {0}")]
    Embedding(ErrorInfo),
    /// Invalid study plan or tool configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Filesystem failures on output locations.
    #[error("io error: {0}")]
    Io(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl BindivError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            BindivError::Discovery(info)
            | BindivError::ToolInvocation(info)
            | BindivError::ResultParse(info)
            | BindivError::Aggregation(info)
            | BindivError::Embedding(info)
            | BindivError::Config(info)
            | BindivError::Serde(info)
            | BindivError::Io(info) => info,
        }
    }
}
