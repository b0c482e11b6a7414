pub mod http;
pub mod misc;
pub mod observability;
pub mod toml;

use rustls::crypto::ring;

/// One-shot application bootstrap: panic hook, tracing, TLS provider.
///
/// Call this first thing in `main` with `env!("CARGO_PKG_NAME")`.
///
/// # Errors
///
/// Returns an error if the tracing subscriber or the rustls provider
/// fails to install.
pub fn setup_application(name: &'static str) -> anyhow::Result<()> {
    setup_panic_hook();
    observability::setup_tracing(name)?;
    setup_tls_provider()
}

/// Routes panics through `tracing` with their source location, then
/// exits with code 1. A panic on the critical worker must never be a
/// silent hang.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Some(location) = panic_info.location() {
            tracing::error!(
                message = %panic_info,
                panic.file = location.file(),
                panic.line = location.line(),
                panic.column = location.column(),
            );
        } else {
            tracing::error!(message = %panic_info);
        }

        #[allow(clippy::exit)]
        std::process::exit(1);
    }))
}

/// Installs the ring crypto provider. rustls 0.23+ does not pick a
/// process-level provider on its own, and both the gRPC stream and the
/// relay client negotiate TLS before any config is read.
pub fn setup_tls_provider() -> anyhow::Result<()> {
    ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {e:?}"))
}
