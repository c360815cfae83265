//! rankeval command line entry point.
//!
//! ```bash
//! # Headline statistics over every model in a result directory
//! rankeval aggregate results/takeOneButType
//!
//! # Rank and hits@k per number of type qualifiers, across models
//! rankeval grouped results/takeOneButType --by NumTypes
//!
//! # A whole method x experiment grid
//! rankeval batch results --methods recommender,baseline --experiments takeOneButType,takeAllButType
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use rankeval::common::config::AppCfg;
use rankeval::common::error::EvalResult;
use rankeval::common::log;
use rankeval::data::{FsRecordRepo, RecordSource};
use rankeval::evaluation::{
    build_summaries_with_progress, combined_group_statistics, experiment_paths,
    simple_aggregate_statistics, GroupStats, ModelStats, ModelSummary,
};
use rankeval::report;

#[derive(Parser)]
#[command(name = "rankeval")]
#[command(about = "Rank and hits@k statistics over model evaluation runs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mean, median and spread of per-model statistics
    Aggregate {
        /// Directory of result files (defaults to RANKEVAL_RESULTS_ROOT)
        dir: Option<PathBuf>,

        #[command(flatten)]
        load: LoadArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Per-group statistics combined across models
    Grouped {
        /// Directory of result files (defaults to RANKEVAL_RESULTS_ROOT)
        dir: Option<PathBuf>,

        /// Record column to group by, e.g. NumTypes or SetSize
        #[arg(long)]
        by: String,

        #[command(flatten)]
        load: LoadArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Statistics of a single result file
    Model {
        /// Path to a result file (.json or .json.gz)
        file: PathBuf,

        /// Also show grouped statistics for this column
        #[arg(long)]
        by: Option<String>,

        /// Write the grouped statistics as CSV into this directory
        #[arg(long, requires = "by")]
        out: Option<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every method/experiment pair under a base directory
    Batch {
        /// Base directory laid out as <method>/<experiment>/
        base: PathBuf,

        /// Method names (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        methods: Vec<String>,

        /// Experiment names (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        experiments: Vec<String>,

        /// Write grouped statistics for this column instead of aggregates
        #[arg(long)]
        by: Option<String>,

        #[command(flatten)]
        load: LoadArgs,

        /// Output directory (defaults to RANKEVAL_OUTPUT_DIR)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct LoadArgs {
    /// Read at most this many result files
    #[arg(long, env = "RANKEVAL_FILE_LIMIT")]
    file_limit: Option<usize>,

    /// Skip result files with fewer transactions
    #[arg(long, env = "RANKEVAL_MIN_TRANSACTIONS")]
    min_transactions: Option<u64>,
}

#[derive(Args)]
struct OutputArgs {
    /// Report name, used for the CSV file name (defaults to the directory name)
    #[arg(long)]
    name: Option<String>,

    /// Output directory (defaults to RANKEVAL_OUTPUT_DIR)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ModelReport {
    model_id: u64,
    statistics: ModelStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    groups: Option<Vec<GroupStats>>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let cfg = AppCfg::load();
    log::init(&cfg);

    match run(cli.command, &cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.code() as u32, "{err}");
            eprintln!("error: {err}");
            ExitCode::from(err.code() as u8)
        }
    }
}

fn run(command: Command, cfg: &AppCfg) -> EvalResult<()> {
    match command {
        Command::Aggregate { dir, load, output } => {
            let dir = dir.unwrap_or_else(|| cfg.results_root.clone());
            let summaries = load_summaries(&dir, &load)?;
            let stats = simple_aggregate_statistics(&summaries)?;
            let name = report_name(output.name, &dir);

            if output.json {
                println!("{}", report::render_json(&stats)?);
            } else {
                print!("{}", report::render_aggregate(&name, &stats));
            }
            let out = output.out.unwrap_or_else(|| cfg.output_dir.clone());
            report::write_aggregate_stats(&out, &name, &stats)?;
        }
        Command::Grouped { dir, by, load, output } => {
            let dir = dir.unwrap_or_else(|| cfg.results_root.clone());
            let summaries = load_summaries(&dir, &load)?;
            let rows = combined_group_statistics(&summaries, &by)?;
            let name = report_name(output.name, &dir);

            if output.json {
                println!("{}", report::render_json(&rows)?);
            } else {
                print!("{}", report::render_group_table(&by, &rows));
            }
            let out = output.out.unwrap_or_else(|| cfg.output_dir.clone());
            report::write_experiment_stats(&out, &name, &by, &rows)?;
        }
        Command::Model {
            file,
            by,
            out,
            json,
        } => {
            let parent = file.parent().unwrap_or_else(|| Path::new("."));
            let summary = ModelSummary::from_result_file(FsRecordRepo::at(parent).load(&file)?)?;
            let statistics = summary.statistics()?;
            let groups = match &by {
                Some(column) => Some(summary.grouped_statistics(column)?.to_vec()),
                None => None,
            };
            if let (Some(dir), Some(column), Some(rows)) = (&out, &by, &groups) {
                let name = format!("model_{}", summary.model_id());
                report::write_group_stats(dir, &name, column, rows)?;
            }

            if json {
                let model = ModelReport {
                    model_id: summary.model_id(),
                    statistics,
                    groups,
                };
                println!("{}", report::render_json(&model)?);
            } else {
                println!("{summary}");
                print!("{}", report::render_model(summary.model_id(), &statistics));
                if let (Some(column), Some(rows)) = (&by, &groups) {
                    print!("{}", report::render_group_table(column, rows));
                }
            }
        }
        Command::Batch {
            base,
            methods,
            experiments,
            by,
            load,
            out,
        } => {
            let out = out.unwrap_or_else(|| cfg.output_dir.clone());
            for (method, per_experiment) in experiment_paths(&base, &methods, &experiments) {
                for (experiment, dir) in per_experiment {
                    let summaries = load_summaries(&dir, &load)?;
                    if summaries.is_empty() {
                        tracing::warn!(%method, %experiment, "no usable result files");
                        continue;
                    }

                    let name = format!("{method}_{experiment}");
                    match &by {
                        Some(column) => {
                            let rows = combined_group_statistics(&summaries, column)?;
                            report::write_experiment_stats(&out, &name, column, &rows)?;
                        }
                        None => {
                            let stats = simple_aggregate_statistics(&summaries)?;
                            print!("{}", report::render_aggregate(&name, &stats));
                            report::write_aggregate_stats(&out, &name, &stats)?;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn load_summaries(dir: &Path, load: &LoadArgs) -> EvalResult<Vec<ModelSummary>> {
    let repo = FsRecordRepo::at(dir);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(dir.display().to_string());

    let result = build_summaries_with_progress(
        &repo,
        load.file_limit,
        load.min_transactions,
        |done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        },
    );
    bar.finish_and_clear();
    result
}

fn report_name(name: Option<String>, dir: &Path) -> String {
    name.or_else(|| {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
    })
    .unwrap_or_else(|| "aggregate".to_string())
}
