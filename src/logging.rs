//! tracing setup. `RUST_LOG` always wins; otherwise `info`, or `debug` in debug mode.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();

/// Install a default stdout subscriber if none exists yet (library use).
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

pub fn default_level(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(debug)))
}

/// Command-line logging: stdout, or append to `log_file` (no ANSI colors) when given.
pub fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter(debug))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt().with_env_filter(env_filter(debug)).try_init();
        }
    }
    // Later init_tracing_once calls become no-ops.
    INIT_ONCE.call_once(|| {});
    Ok(())
}
