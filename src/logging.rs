//! Diagnostics on stderr via `tracing`.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber. `RUST_LOG`, when set, takes precedence over `config.level`.
///
/// Errors if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| eyre!("Failed to initialize logging: {}", e))
}

/// Our own events at `level`; dependencies only at warn and above.
fn default_directive(level: &str) -> String {
    let level = level.to_lowercase();
    format!("warn,tabq={}", level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_parses() {
        for level in ["error", "warn", "INFO", "debug", "trace", "off"] {
            let directive = default_directive(level);
            assert!(
                EnvFilter::try_new(&directive).is_ok(),
                "bad directive {}",
                directive
            );
        }
    }
}
