//! Aggregation across model runs.
//!
//! Builds [`ModelSummary`] values from a record source and folds many of them
//! into experiment-level statistics.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::error::{ErrorCode, EvalError, EvalResult};
use crate::data::domain::RecordSource;

use super::domain::{AggregateStats, ExperimentGroupStats, GroupColumn, GroupKey};
use super::stats::{self, round4};
use super::summary::ModelSummary;

/// Load every result file of `source` into a summary.
///
/// Files are read in path order. `file_limit` keeps only the first N files;
/// files without transactions, or with fewer than `min_transactions`, are
/// skipped. Files that do not decode into a [`ResultFile`] (for instance a
/// non-numeric `ModelID`) are logged and skipped; IO failures abort.
///
/// [`ResultFile`]: crate::data::domain::ResultFile
pub fn build_summaries<S>(
    source: &S,
    file_limit: Option<usize>,
    min_transactions: Option<u64>,
) -> EvalResult<Vec<ModelSummary>>
where
    S: RecordSource + ?Sized,
{
    build_summaries_with_progress(source, file_limit, min_transactions, |_, _| {})
}

/// Same as [`build_summaries`], calling `on_file(done, total)` after each file is read.
pub fn build_summaries_with_progress<S, F>(
    source: &S,
    file_limit: Option<usize>,
    min_transactions: Option<u64>,
    mut on_file: F,
) -> EvalResult<Vec<ModelSummary>>
where
    S: RecordSource + ?Sized,
    F: FnMut(usize, usize),
{
    let mut paths = source.list()?;
    paths.sort();
    if let Some(limit) = file_limit {
        paths.truncate(limit);
    }

    let total = paths.len();
    let mut summaries = Vec::with_capacity(total);
    let mut skipped = 0usize;
    for (idx, path) in paths.iter().enumerate() {
        let loaded = source.load(path);
        on_file(idx + 1, total);
        let file = match loaded {
            Ok(file) => file,
            Err(err) if err.code() == ErrorCode::Decode => {
                tracing::warn!(path = %path.display(), error = %err, "skipping undecodable result file");
                skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };

        let trans_count = file.transaction_count();
        if trans_count == 0 || min_transactions.is_some_and(|min| trans_count < min) {
            tracing::debug!(
                path = %path.display(),
                trans_count,
                "skipping result file below transaction threshold"
            );
            continue;
        }

        summaries.push(ModelSummary::from_result_file(file)?);
    }

    tracing::info!(
        files = total,
        models = summaries.len(),
        undecodable = skipped,
        "built model summaries"
    );
    Ok(summaries)
}

/// Grouped statistics of every model, re-aggregated per group value.
///
/// Counts are summed; means and hit rates are plain means of the per-model
/// group rows, not re-weighted by count.
pub fn combined_group_statistics(
    summaries: &[ModelSummary],
    groupby: &str,
) -> EvalResult<Vec<ExperimentGroupStats>> {
    groupby.parse::<GroupColumn>()?;

    #[derive(Default)]
    struct Combined {
        count: u64,
        mean: Vec<f64>,
        top1: Vec<f64>,
        top5: Vec<f64>,
        top10: Vec<f64>,
    }

    let mut groups: BTreeMap<GroupKey, Combined> = BTreeMap::new();
    for summary in summaries {
        for row in summary.grouped_statistics(groupby)?.iter() {
            let entry = groups.entry(row.group.clone()).or_default();
            entry.count += row.count;
            entry.mean.push(row.mean);
            entry.top1.push(row.top1);
            entry.top5.push(row.top5);
            entry.top10.push(row.top10);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(group, c)| ExperimentGroupStats {
            group,
            count: c.count,
            mean: round4(stats::mean(&c.mean)),
            top1: round4(stats::mean(&c.top1)),
            top5: round4(stats::mean(&c.top5)),
            top10: round4(stats::mean(&c.top10)),
        })
        .collect())
}

/// Headline statistics of each model, averaged over all models.
pub fn simple_aggregate_statistics(summaries: &[ModelSummary]) -> EvalResult<AggregateStats> {
    if summaries.is_empty() {
        return Err(EvalError::invalid(
            "cannot aggregate statistics over zero models",
        ));
    }

    let n = summaries.len();
    let mut ranks = Vec::with_capacity(n);
    let mut top1 = Vec::with_capacity(n);
    let mut top5 = Vec::with_capacity(n);
    let mut top10 = Vec::with_capacity(n);
    let mut missing = Vec::with_capacity(n);
    let mut duration = Vec::with_capacity(n);

    for summary in summaries {
        ranks.push(summary.average_rank(None)?);
        top1.push(summary.hit_rate(1, None)?);
        top5.push(summary.hit_rate(5, None)?);
        top10.push(summary.hit_rate(10, None)?);
        missing.push(summary.missing_percent());
        duration.push(summary.eval_time("ms", true)?);
    }

    Ok(AggregateStats {
        mean: round4(stats::mean(&ranks)),
        median: round4(stats::median(&ranks)),
        std_dev: round4(stats::population_std(&ranks)),
        top1: round4(stats::mean(&top1)),
        top5: round4(stats::mean(&top5)),
        top10: round4(stats::mean(&top10)),
        missing: round4(stats::mean(&missing)),
        duration: round4(stats::mean(&duration)),
    })
}

/// Result directories of an experiment batch: `base/<method>/<experiment>/`.
pub fn experiment_paths(
    base: &Path,
    methods: &[String],
    experiments: &[String],
) -> BTreeMap<String, BTreeMap<String, PathBuf>> {
    methods
        .iter()
        .map(|method| {
            let per_experiment = experiments
                .iter()
                .map(|experiment| (experiment.clone(), base.join(method).join(experiment)))
                .collect();
            (method.clone(), per_experiment)
        })
        .collect()
}
