use std::fs;
use std::path::{Path, PathBuf};

use bindiv_core::errors::{BindivError, ErrorInfo};
use bindiv_core::serde::write_json_file;
use bindiv_stat::{CellSummary, EmbeddingOutcome};
use csv::Writer;

use crate::report::StudyReport;

/// Canonical JSON report file name.
pub const REPORT_FILE: &str = "study_report.json";
/// Persisted distance matrix consumed by offline embedding.
pub const DISTANCE_JSON_FILE: &str = "distance_matrix.json";

fn wrap_csv(code: &str, path: &Path, err: impl ToString) -> BindivError {
    BindivError::Io(
        ErrorInfo::new(code, "failed to write CSV export")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

struct Table {
    path: PathBuf,
    writer: Writer<fs::File>,
}

impl Table {
    fn create(dir: &Path, name: &str, header: &[String]) -> Result<Self, BindivError> {
        let path = dir.join(name);
        let mut writer =
            Writer::from_path(&path).map_err(|err| wrap_csv("bindiv_exp.csv_open", &path, err))?;
        writer
            .write_record(header)
            .map_err(|err| wrap_csv("bindiv_exp.csv_header", &path, err))?;
        Ok(Self { path, writer })
    }

    fn row(&mut self, record: &[String]) -> Result<(), BindivError> {
        self.writer
            .write_record(record)
            .map_err(|err| wrap_csv("bindiv_exp.csv_row", &self.path, err))
    }

    fn finish(mut self) -> Result<PathBuf, BindivError> {
        self.writer
            .flush()
            .map_err(|err| wrap_csv("bindiv_exp.csv_flush", &self.path, err))?;
        Ok(self.path)
    }
}

fn header(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|column| column.to_string()).collect()
}

fn number(value: Option<f64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

fn stats_columns(summary: &CellSummary) -> Vec<String> {
    match summary.stats() {
        None => vec!["0".to_string(), String::new(), String::new(), String::new(), String::new()],
        Some(stats) => vec![
            stats.count.to_string(),
            stats.mean.to_string(),
            number(stats.std_dev),
            stats.min.to_string(),
            stats.max.to_string(),
        ],
    }
}

/// Writes the report and every derived table below `out`; returns the written paths.
///
/// Missing cells are written as empty CSV fields and `null` in JSON, never as 0.
pub fn write_exports(report: &StudyReport, out: &Path) -> Result<Vec<PathBuf>, BindivError> {
    let mut written = Vec::new();

    let report_path = out.join(REPORT_FILE);
    write_json_file(&report_path, report)?;
    written.push(report_path);

    let matrix_path = out.join(DISTANCE_JSON_FILE);
    write_json_file(&matrix_path, &report.distance)?;
    written.push(matrix_path);

    let mut table = Table::create(
        out,
        "pairs.csv",
        &header(&[
            "index",
            "pair_id",
            "primary_group",
            "primary_artifact",
            "secondary_group",
            "secondary_artifact",
            "status",
            "observations",
            "mean_similarity",
            "detail",
        ]),
    )?;
    for outcome in &report.pairs {
        table.row(&[
            outcome.index.to_string(),
            outcome.pair_id.clone(),
            outcome.pair.primary.group_label.clone(),
            outcome.pair.primary.name.clone(),
            outcome.pair.secondary.group_label.clone(),
            outcome.pair.secondary.name.clone(),
            outcome.status.as_str().to_string(),
            outcome.observations.to_string(),
            number(outcome.mean_similarity),
            outcome.detail.clone().unwrap_or_default(),
        ])?;
    }
    written.push(table.finish()?);

    let mut table = Table::create(
        out,
        "pair_stats.csv",
        &header(&["primary", "secondary", "count", "mean", "std_dev", "min", "max"]),
    )?;
    for cell in &report.pair_stats {
        let mut record = vec![cell.pair.primary.clone(), cell.pair.secondary.clone()];
        record.extend(stats_columns(&cell.summary));
        table.row(&record)?;
    }
    written.push(table.finish()?);

    let mut table = Table::create(
        out,
        "function_stats.csv",
        &header(&["function", "count", "mean", "std_dev", "min", "max"]),
    )?;
    for (name, summary) in &report.function_stats {
        let mut record = vec![name.clone()];
        record.extend(stats_columns(summary));
        table.row(&record)?;
    }
    written.push(table.finish()?);

    let mut table = Table::create(
        out,
        "stable_functions.csv",
        &header(&["function", "mean", "std_dev"]),
    )?;
    for name in &report.functions.stable {
        if let Some(stats) = report.function_stats.get(name).and_then(CellSummary::stats) {
            table.row(&[name.clone(), stats.mean.to_string(), number(stats.std_dev)])?;
        }
    }
    written.push(table.finish()?);

    let mut table = Table::create(out, "always_identical.csv", &header(&["function", "count"]))?;
    for name in &report.functions.always_identical {
        let count = report
            .function_stats
            .get(name)
            .map(CellSummary::count)
            .unwrap_or_default();
        table.row(&[name.clone(), count.to_string()])?;
    }
    written.push(table.finish()?);

    let labels = report.distance.labels();
    let mut matrix_header = vec![String::new()];
    matrix_header.extend(labels.iter().cloned());

    let mut table = Table::create(out, "distance_matrix.csv", &matrix_header)?;
    for (label, row) in labels.iter().zip(report.distance.rows()) {
        let mut record = vec![label.clone()];
        record.extend(row.into_iter().map(number));
        table.row(&record)?;
    }
    written.push(table.finish()?);

    let mut table = Table::create(out, "matrix_annotated.csv", &matrix_header)?;
    for (label, row) in report.annotated.labels.iter().zip(&report.annotated.rows) {
        let mut record = vec![label.clone()];
        record.extend(row.iter().cloned());
        table.row(&record)?;
    }
    written.push(table.finish()?);

    written.push(write_embedding_csv(&report.embedding, out)?);
    Ok(written)
}

/// Writes `embedding.csv`; a refused embedding yields a header-only table.
pub fn write_embedding_csv(outcome: &EmbeddingOutcome, out: &Path) -> Result<PathBuf, BindivError> {
    let dims = outcome
        .embedding()
        .and_then(|embedding| embedding.points.first())
        .map_or(2, |point| point.coords.len());
    let mut columns = vec!["label".to_string()];
    columns.extend((0..dims).map(axis_name));
    let mut table = Table::create(out, "embedding.csv", &columns)?;
    if let Some(embedding) = outcome.embedding() {
        for point in &embedding.points {
            let mut record = vec![point.label.clone()];
            record.extend(point.coords.iter().map(|value| value.to_string()));
            table.row(&record)?;
        }
    }
    table.finish()
}

fn axis_name(axis: usize) -> String {
    match axis {
        0 => "x".to_string(),
        1 => "y".to_string(),
        other => format!("dim{other}"),
    }
}
