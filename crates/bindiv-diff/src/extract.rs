use std::path::Path;
use std::sync::OnceLock;

use bindiv_core::errors::{BindivError, ErrorInfo};
use bindiv_core::{DiffResult, ScoreRecord, Similarity};
use regex::Regex;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::debug;

const FUNCTION_PROJECTION: &str = "SELECT name1, name2, similarity FROM function ORDER BY rowid";
const SIMILARITY_PROJECTION: &str = "SELECT similarity FROM function ORDER BY rowid";
const LOG_PATTERN: &str = r"Similarity:\s*([0-9]+(?:\.[0-9]+)?)%";

fn parse_error(code: &str, path: &Path, err: impl ToString) -> BindivError {
    BindivError::ResultParse(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Which part of a diff result feeds the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Extraction {
    /// One aggregate percentage scanned from the tool's log text.
    #[default]
    LogText,
    /// Per-function similarities read from the structured result store.
    Structured,
}

/// Scores extracted from one successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// Per-function records (may be empty).
    Functions(Vec<ScoreRecord>),
    /// Single artifact-level similarity, absent when the log has no match.
    Aggregate(Option<Similarity>),
}

impl Extracted {
    /// Number of similarity observations carried.
    pub fn observations(&self) -> usize {
        match self {
            Extracted::Functions(records) => records.len(),
            Extracted::Aggregate(value) => usize::from(value.is_some()),
        }
    }
}

impl Extraction {
    pub fn extract(&self, result: &DiffResult) -> Result<Extracted, BindivError> {
        match self {
            Extraction::LogText => Ok(Extracted::Aggregate(extract_log_similarity(&result.log)?)),
            Extraction::Structured => {
                let Some(path) = result.result_path.as_deref() else {
                    return Ok(Extracted::Functions(Vec::new()));
                };
                Ok(Extracted::Functions(extract_function_scores(path)?))
            }
        }
    }

    /// Structured mode needs the result file; log-text mode only the captured output.
    pub fn requires_result_file(&self) -> bool {
        matches!(self, Extraction::Structured)
    }
}

fn open_read_only(path: &Path) -> Result<Connection, BindivError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|err| parse_error("bindiv_diff.sqlite_open", path, err))
}

/// Reads `(name1, name2, similarity)` rows from the `function` table.
///
/// Rows with a NULL similarity or NULL primary name carry no usable
/// observation and are skipped.
pub fn extract_function_scores(path: &Path) -> Result<Vec<ScoreRecord>, BindivError> {
    let conn = open_read_only(path)?;
    let mut stmt = conn
        .prepare(FUNCTION_PROJECTION)
        .map_err(|err| parse_error("bindiv_diff.sqlite_query", path, err))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<f64>>(2)?,
            ))
        })
        .map_err(|err| parse_error("bindiv_diff.sqlite_query", path, err))?;
    let mut records = Vec::new();
    for row in rows {
        let (name, matched, similarity) =
            row.map_err(|err| parse_error("bindiv_diff.sqlite_row", path, err))?;
        let (Some(function_name), Some(similarity)) = (name, similarity) else {
            continue;
        };
        let similarity = Similarity::from_fraction(similarity).map_err(|err| {
            parse_error("bindiv_diff.similarity_range", path, err)
        })?;
        records.push(ScoreRecord {
            function_name,
            matched_name: matched,
            similarity,
        });
    }
    debug!(path = %path.display(), records = records.len(), "extracted function scores");
    Ok(records)
}

/// Reads the similarity column only, including rows without function names.
pub fn extract_similarities(path: &Path) -> Result<Vec<Similarity>, BindivError> {
    let conn = open_read_only(path)?;
    let mut stmt = conn
        .prepare(SIMILARITY_PROJECTION)
        .map_err(|err| parse_error("bindiv_diff.sqlite_query", path, err))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, Option<f64>>(0))
        .map_err(|err| parse_error("bindiv_diff.sqlite_query", path, err))?;
    let mut values = Vec::new();
    for row in rows {
        let value = row.map_err(|err| parse_error("bindiv_diff.sqlite_row", path, err))?;
        if let Some(value) = value {
            values.push(
                Similarity::from_fraction(value)
                    .map_err(|err| parse_error("bindiv_diff.similarity_range", path, err))?,
            );
        }
    }
    Ok(values)
}

fn log_pattern() -> Result<&'static Regex, BindivError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(LOG_PATTERN))
        .as_ref()
        .map_err(|err| {
            BindivError::ResultParse(ErrorInfo::new("bindiv_diff.log_pattern", err.to_string()))
        })
}

/// Scans log text for the first `Similarity: <float>%` line.
pub fn extract_log_similarity(log: &str) -> Result<Option<Similarity>, BindivError> {
    let Some(captures) = log_pattern()?.captures(log) else {
        return Ok(None);
    };
    let raw = &captures[1];
    let percent: f64 = raw.parse().map_err(|err: std::num::ParseFloatError| {
        BindivError::ResultParse(
            ErrorInfo::new("bindiv_diff.log_value", err.to_string()).with_context("value", raw),
        )
    })?;
    Similarity::from_percent(percent).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_similarity_takes_first_match() {
        let log = "Reading primary\nSimilarity: 91.25%\nConfidence: 99.0%\nSimilarity: 10.0%\n";
        let value = extract_log_similarity(log).expect("parse").expect("match");
        assert!((value.value() - 0.9125).abs() < 1e-12);
    }

    #[test]
    fn log_without_similarity_is_none() {
        assert_eq!(extract_log_similarity("nothing to see").expect("parse"), None);
        assert_eq!(extract_log_similarity("").expect("parse"), None);
    }

    #[test]
    fn log_percentage_above_hundred_is_rejected() {
        assert!(extract_log_similarity("Similarity: 140.0%").is_err());
    }

    #[test]
    fn integer_percentages_are_accepted() {
        let value = extract_log_similarity("Similarity: 100%").expect("parse");
        assert_eq!(value.map(Similarity::value), Some(1.0));
    }

    #[test]
    fn structured_mode_without_file_is_empty() {
        let result = DiffResult::success("Similarity: 50.0%", None);
        let extracted = Extraction::Structured.extract(&result).expect("extract");
        assert_eq!(extracted, Extracted::Functions(Vec::new()));
        assert_eq!(extracted.observations(), 0);
    }
}
