//! Rendering and persistence of statistics tables.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::common::error::{EvalError, EvalResult};
use crate::evaluation::domain::{
    AggregateStats, ExperimentGroupStats, GroupKey, GroupStats, ModelStats,
};

use super::domain::TableRow;

/// Human readable block for statistics aggregated over many models.
pub fn render_aggregate(label: &str, stats: &AggregateStats) -> String {
    format!(
        "Results for {label}\n\
         Rank:\n\
         \tMean: {}\n\
         \tMedian: {}\n\
         \tStandard Deviation: {}\n\
         Hits:\n\
         \t@1: {}%\n\
         \t@5: {}%\n\
         \t@10: {}%\n\
         Missing: {}\n\
         Duration: {} ms\n",
        stats.mean,
        stats.median,
        stats.std_dev,
        stats.top1,
        stats.top5,
        stats.top10,
        stats.missing,
        stats.duration,
    )
}

/// Human readable block for a single model.
pub fn render_model(model_id: u64, stats: &ModelStats) -> String {
    format!(
        "Results for model {model_id}\n\
         Rank:\n\
         \tMean: {}\n\
         Hits:\n\
         \t@1: {}%\n\
         \t@5: {}%\n\
         \t@10: {}%\n",
        stats.mean, stats.top1, stats.top5, stats.top10,
    )
}

/// Right-aligned text table with a header row.
pub fn render_group_table<R: TableRow>(group_column: &str, rows: &[R]) -> String {
    let header = R::header(group_column);
    let body: Vec<Vec<String>> = rows.iter().map(TableRow::fields).collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, name)| {
            body.iter()
                .filter_map(|row| row.get(i))
                .map(String::len)
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for line in std::iter::once(&header).chain(body.iter()) {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:>width$}"))
            .collect();
        out.push_str(&cells.join("  "));
        out.push('\n');
    }
    out
}

/// Pretty JSON for any statistics value.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> EvalResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write one model's grouped statistics to `<dir>/<name>_stats.csv`.
pub fn write_group_stats(
    dir: &Path,
    name: &str,
    group_column: &str,
    rows: &[GroupStats],
) -> EvalResult<PathBuf> {
    write_table(dir, name, group_column, rows)
}

/// Write re-aggregated experiment statistics to `<dir>/<name>_stats.csv`.
pub fn write_experiment_stats(
    dir: &Path,
    name: &str,
    group_column: &str,
    rows: &[ExperimentGroupStats],
) -> EvalResult<PathBuf> {
    write_table(dir, name, group_column, rows)
}

/// Write flat aggregate statistics to `<dir>/<name>_stats.csv`.
pub fn write_aggregate_stats(dir: &Path, name: &str, stats: &AggregateStats) -> EvalResult<PathBuf> {
    write_table(dir, name, "", std::slice::from_ref(stats))
}

/// Load rows previously written by [`write_experiment_stats`].
pub fn read_experiment_stats(dir: &Path, name: &str) -> EvalResult<Vec<ExperimentGroupStats>> {
    let path = stats_path(dir, name);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(&path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or_default();
        let number = |i: usize| -> EvalResult<f64> {
            field(i).parse().map_err(|_| {
                EvalError::invalid(format!(
                    "{}: column {i} holds {:?}, expected a number",
                    path.display(),
                    field(i)
                ))
            })
        };
        let count = field(1).parse::<u64>().map_err(|_| {
            EvalError::invalid(format!(
                "{}: count {:?} is not an integer",
                path.display(),
                field(1)
            ))
        })?;

        rows.push(ExperimentGroupStats {
            group: GroupKey::parse(field(0)),
            count,
            mean: number(2)?,
            top1: number(3)?,
            top5: number(4)?,
            top10: number(5)?,
        });
    }
    Ok(rows)
}

fn stats_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}_stats.csv"))
}

fn write_table<R: TableRow>(
    dir: &Path,
    name: &str,
    group_column: &str,
    rows: &[R],
) -> EvalResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| EvalError::io(dir, e))?;
    let path = stats_path(dir, name);

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(R::header(group_column))?;
    for row in rows {
        writer.write_record(row.fields())?;
    }
    writer.flush().map_err(|e| EvalError::io(&path, e))?;

    tracing::info!(path = %path.display(), rows = rows.len(), "saved statistics");
    println!("Saved results to {}", path.display());
    Ok(path)
}
