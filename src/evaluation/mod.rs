//! Per-model summaries and their aggregation across models.
//!
//! A [`ModelSummary`] answers rank and hits@k questions for a single model
//! and memoizes each answer; the service functions combine many summaries.

pub mod domain;
pub mod service;
pub mod stats;
pub mod summary;

pub use domain::{
    AggregateStats, ExperimentGroupStats, GroupColumn, GroupKey, GroupStats, HitCutoff, ModelStats,
};
pub use service::{
    build_summaries, build_summaries_with_progress, combined_group_statistics, experiment_paths,
    simple_aggregate_statistics,
};
pub use summary::ModelSummary;
