/*!
Logging setup for workshot binaries.

Library code only emits `tracing` events; installing a subscriber is left to
the binary. Output goes to stderr so it never mixes with command output.
*/

use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{Result, WorkshotError};

const DEFAULT_DIRECTIVE: &str = "workshot=warn,workshot_core=warn";
const VERBOSE_DIRECTIVE: &str = "workshot=debug,workshot_core=debug";

/// Filter from `RUST_LOG` when set, otherwise warnings only (debug when verbose)
fn build_filter(verbose: bool) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = if verbose {
        VERBOSE_DIRECTIVE
    } else {
        DEFAULT_DIRECTIVE
    };
    EnvFilter::try_new(directive)
        .map_err(|e| WorkshotError::config(format!("invalid log filter '{directive}': {e}")))
}

/// Install the global tracing subscriber
///
/// # Arguments
/// * `verbose` - Log debug events from workshot crates
/// * `json` - Emit one JSON object per event instead of human-readable lines
///
/// # Errors
/// * `WorkshotError::Config` - a global subscriber is already installed
pub fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let filter = build_filter(verbose)?;

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
    });

    let subscriber = TracingRegistry::default()
        .with(filter)
        .with(json_layer)
        .with(text_layer);

    set_global_default(subscriber).map_err(|e| {
        WorkshotError::config(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::debug!("logging initialized");
    Ok(())
}
