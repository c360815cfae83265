//! Runtime configuration loaded from the environment.
//!
//! Command line flags override these values; the snapshot only supplies
//! defaults so scripted batch runs can be configured without long argument lists.

use std::env;
use std::path::PathBuf;

/// Snapshot of configuration values consumed by the crate.
#[derive(Clone, Debug)]
pub struct AppCfg {
    /// Directory holding per-model result files.
    pub results_root: PathBuf,
    /// Directory CSV reports are written to.
    pub output_dir: PathBuf,
    /// `tracing` filter directive, e.g. `info` or `rankeval=debug`.
    pub log_filter: String,
    /// Emit JSON log lines instead of the compact human format.
    pub log_json: bool,
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> Self {
        fn env_or(key: &str, default: &str) -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        }

        Self {
            results_root: PathBuf::from(env_or("RANKEVAL_RESULTS_ROOT", "./results")),
            output_dir: PathBuf::from(env_or("RANKEVAL_OUTPUT_DIR", "./stats")),
            log_filter: env_or("RANKEVAL_LOG", "info"),
            log_json: parse_flag(&env_or("RANKEVAL_LOG_JSON", "0")),
        }
    }
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            results_root: PathBuf::from("./results"),
            output_dir: PathBuf::from("./stats"),
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
