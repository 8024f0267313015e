//! Invocation contract for the external binary diffing engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::ComparisonPair;

/// Classification of a single diff invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffStatus {
    /// Tool exited cleanly and produced the expected outputs.
    Success,
    /// Tool exited non-zero, timed out or could not be started.
    ToolError,
    /// Tool exited cleanly but the expected result is absent.
    NoResult,
}

/// Outcome of one [`ComparisonPair`] invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Classification of the invocation.
    pub status: DiffStatus,
    /// Captured standard output of the tool.
    #[serde(default)]
    pub log: String,
    /// Captured standard error of the tool.
    #[serde(default)]
    pub stderr: String,
    /// Structured result file, when one was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<PathBuf>,
    /// Log file written as a side effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    /// Diagnostic explaining a non-success status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DiffResult {
    /// Successful invocation with captured output.
    pub fn success(log: impl Into<String>, result_path: Option<PathBuf>) -> Self {
        Self {
            status: DiffStatus::Success,
            log: log.into(),
            stderr: String::new(),
            result_path,
            log_path: None,
            detail: None,
        }
    }

    /// Failed invocation; the pair is recorded as missing.
    pub fn tool_error(detail: impl Into<String>) -> Self {
        Self {
            status: DiffStatus::ToolError,
            log: String::new(),
            stderr: String::new(),
            result_path: None,
            log_path: None,
            detail: Some(detail.into()),
        }
    }

    /// Clean exit without a usable result.
    pub fn no_result(detail: impl Into<String>) -> Self {
        Self {
            status: DiffStatus::NoResult,
            log: String::new(),
            stderr: String::new(),
            result_path: None,
            log_path: None,
            detail: Some(detail.into()),
        }
    }

    /// Attaches captured standard error.
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Attaches captured standard output.
    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }

    /// Records where the log was persisted.
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }
}

/// Capability wrapping the external diffing engine.
///
/// Implementations never return errors: every failure is classified into the
/// returned [`DiffResult`] so one broken pair cannot abort a study.
pub trait Differ: Send + Sync {
    /// Compares the two artifacts of `pair`, writing side-effect files below `output_dir`.
    fn diff(&self, pair: &ComparisonPair, output_dir: &Path) -> DiffResult;
}

impl<D: Differ + ?Sized> Differ for &D {
    fn diff(&self, pair: &ComparisonPair, output_dir: &Path) -> DiffResult {
        (**self).diff(pair, output_dir)
    }
}
