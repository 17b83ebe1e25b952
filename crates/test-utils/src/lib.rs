//! Shared helpers for sitewright's integration tests: graph builders over
//! recording actions, a fake executor backend, and tracing/timeout glue.

pub mod builders;
pub mod fake_executor;
pub mod recording;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

/// Upper bound for any single async test body.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Install a test-captured subscriber once per test binary.
///
/// Filter comes from `RUST_LOG`, falling back to `sitewright=debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("sitewright=debug"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .try_init();
    });
}

/// Await `fut`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F: Future>(fut: F) -> F::Output {
    match tokio::time::timeout(TEST_TIMEOUT, fut).await {
        Ok(out) => out,
        Err(_) => panic!("test did not finish within {TEST_TIMEOUT:?}"),
    }
}
