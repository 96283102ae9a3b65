use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a fmt subscriber on stderr if none is active yet.
///
/// Honours `RUST_LOG`, otherwise falls back to `default_filter`. Calling this
/// more than once is harmless.
pub fn init_tracing(default_filter: &str) {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}
