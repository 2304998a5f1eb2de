//! Global `tracing` subscriber installation.
//!
//! In the browser events go to the developer console through `tracing-wasm`.
//! Everywhere else (headless hosts, tests) they go to stderr, filtered by
//! `RUST_LOG`.

use std::sync::Once;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

static TRACING_INSTALLED: Once = Once::new();

/// Installs the subscriber (idempotent).
///
/// Does nothing when another global subscriber is already set.
pub fn install() {
    TRACING_INSTALLED.call_once(|| {
        if install_subscriber().is_err() {
            tracing::debug!("a global tracing subscriber was already installed");
        }
    });
}

#[cfg(target_arch = "wasm32")]
fn install_subscriber() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    tracing_wasm::try_set_as_global_default()
}

#[cfg(not(target_arch = "wasm32"))]
fn install_subscriber() -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
}
