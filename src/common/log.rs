//! Logging setup on top of `tracing-subscriber`.
//!
//! Library code only emits `tracing` events; installing a subscriber is left to
//! the binary (or to tests that want to see the output).

use tracing_subscriber::EnvFilter;

use super::config::AppCfg;

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init(cfg: &AppCfg) {
    let filter = EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if cfg.log_json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
