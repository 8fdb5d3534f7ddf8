//! Tracing subscriber setup for the binary. Logs go to stderr so command
//! output on stdout stays scriptable.

use crate::args::LogFormat;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,strata=info,strata_executor=info,strata_cli=info";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
/// A second call is a no-op.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(?format, "logging initialized");
    }
}
