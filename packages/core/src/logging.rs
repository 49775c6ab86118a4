//! Tracing subscriber setup
//!
//! The library itself only emits `tracing` events. Binaries, benches and tests that
//! want to see them call [`init_tracing`] once at startup.

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`
///
/// Falls back to `default_directive` (for example `"ziggurat_core=debug"`) when
/// `RUST_LOG` is unset or invalid. Returns `false` if a global subscriber was
/// already installed, which makes repeated calls from tests harmless.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_tracing("warn");
        assert!(!init_tracing("warn"));
    }
}
