// lib.rs - rank evaluation library
pub mod common;
pub mod data;
pub mod evaluation;
pub mod report;

pub use common::{EvalError, EvalResult};
pub use evaluation::{
    build_summaries, combined_group_statistics, simple_aggregate_statistics, ModelSummary,
};
