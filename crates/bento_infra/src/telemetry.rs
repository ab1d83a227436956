//! Process-wide tracing setup.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// `RUST_LOG` wins; otherwise `fallback_level`, otherwise `info`.
pub fn env_filter(fallback_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the fmt subscriber and the panic hook. Safe to call more than once.
pub fn init_tracing(fallback_level: &str) {
    TRACING_INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter(fallback_level))
            .with_target(true)
            .try_init();
        install_panic_hook();
    });
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(%location, panic = %info, "panic");
        previous(info);
    }));
}
