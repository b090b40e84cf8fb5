//! # Logging Setup
//!
//! Installs the global `tracing` subscriber. Both entry points use the same compact
//! format without module paths (`with_target(false)`); what differs is where the default
//! level comes from:
//!
//! - [`setup_tracing`] reads `RUST_LOG` only.
//! - [`setup_tracing_with`] takes the level and an optional log file from [`LogConfig`].
//!   `RUST_LOG` still wins when it is set.
//!
//! Installing a subscriber twice is not an error: the first one stays. This keeps tests
//! that each build an [`App`](crate::App) from fighting over the global dispatcher.
//!
//! ```bash
//! # Everything the container does, including each factory it runs
//! RUST_LOG=debug cargo run -p wiring-sample -- run
//!
//! # Only the framework
//! RUST_LOG=wiring=trace cargo run -p wiring-sample -- run
//! ```
//!
//! With `level: 3` a normal run prints:
//!
//! ```text
//! INFO Registering dependencies
//! INFO Running dependencies
//! INFO build: Dependencies built services=3
//! INFO Stop dependencies
//! ```

use crate::config::{ConfigError, LogConfig};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

/// Installs the subscriber described by `config`.
///
/// Fails only when the log file cannot be opened.
pub fn setup_tracing_with(config: &LogConfig) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| ConfigError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.try_init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_unwritable_log_file_is_reported() {
        let config = LogConfig {
            log_file: Some(PathBuf::from("/definitely/not/a/dir/app.log")),
            ..LogConfig::default()
        };
        assert!(matches!(
            setup_tracing_with(&config),
            Err(ConfigError::LogFile { .. })
        ));
    }

    #[test]
    fn test_second_setup_is_harmless() {
        setup_tracing();
        setup_tracing();
        assert!(setup_tracing_with(&LogConfig::interactive()).is_ok());
    }
}
