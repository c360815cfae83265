//! Console and CSV reporting of computed statistics.

pub mod domain;
pub mod service;

pub use domain::TableRow;
pub use service::{
    read_experiment_stats, render_aggregate, render_json, render_model, render_group_table,
    write_aggregate_stats, write_experiment_stats, write_group_stats,
};
