pub use insta::assert_snapshot;
use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber once per test binary. `RUST_LOG` overrides the
/// default `debug` level.
pub fn logging() {
    use std::sync::Once;

    static ONCE: Once = Once::new();

    ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
