//! Shared utilities: configuration, errors, logging and time units.
pub mod config;
pub mod error;
pub mod log;
pub mod time;

pub use config::AppCfg;
pub use error::{ErrorCode, EvalError, EvalResult};
pub use time::TimeUnit;
