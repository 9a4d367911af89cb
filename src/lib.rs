pub mod config;
pub mod models;
pub mod intelligence; // Threshold table, vital classifier, risk aggregation
pub mod pipeline; // Extraction parser + analysis clients
pub mod monitor; // Debounced safety monitor
pub mod referral;

#[cfg(test)]
mod test_support;

use tracing_subscriber::EnvFilter;

pub use monitor::{MonitorInput, MonitorState, SafetyMonitor};

/// Install the global tracing subscriber. `RUST_LOG` wins over the default
/// filter; a second call is a no-op.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
