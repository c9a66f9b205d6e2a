pub mod config;
pub mod models;
pub mod db;
pub mod pipeline; // Upload → extraction → patterns → consolidation → report

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the default filter is used, raised to
/// debug for this crate when `verbose` is on. Output goes to stderr so command
/// output on stdout stays machine-readable.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "genoreport=debug,warn"
    } else {
        config::default_log_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
