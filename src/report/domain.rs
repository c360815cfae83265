//! Tabular shape of every statistics row the reporter knows how to emit.

use crate::evaluation::domain::{AggregateStats, ExperimentGroupStats, GroupStats};

/// A statistics row with a fixed set of columns.
///
/// `group_column` names the leading group column for grouped rows; rows
/// without a group value ignore it.
pub trait TableRow {
    fn header(group_column: &str) -> Vec<String>;
    fn fields(&self) -> Vec<String>;
}

fn named(group_column: &str, rest: &[&str]) -> Vec<String> {
    std::iter::once(group_column)
        .chain(rest.iter().copied())
        .map(str::to_string)
        .collect()
}

impl TableRow for GroupStats {
    fn header(group_column: &str) -> Vec<String> {
        named(
            group_column,
            &["Count", "Mean", "Median", "Stddev", "Top1", "Top5", "Top10"],
        )
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.group.to_string(),
            self.count.to_string(),
            self.mean.to_string(),
            self.median.to_string(),
            self.stddev.to_string(),
            self.top1.to_string(),
            self.top5.to_string(),
            self.top10.to_string(),
        ]
    }
}

impl TableRow for ExperimentGroupStats {
    fn header(group_column: &str) -> Vec<String> {
        named(group_column, &["Count", "Mean", "Top1", "Top5", "Top10"])
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.group.to_string(),
            self.count.to_string(),
            self.mean.to_string(),
            self.top1.to_string(),
            self.top5.to_string(),
            self.top10.to_string(),
        ]
    }
}

impl TableRow for AggregateStats {
    fn header(_group_column: &str) -> Vec<String> {
        [
            "Mean", "Median", "StdDev", "Top1", "Top5", "Top10", "Missing", "Duration",
        ]
        .map(str::to_string)
        .to_vec()
    }

    fn fields(&self) -> Vec<String> {
        [
            self.mean,
            self.median,
            self.std_dev,
            self.top1,
            self.top5,
            self.top10,
            self.missing,
            self.duration,
        ]
        .map(|v| v.to_string())
        .to_vec()
    }
}
