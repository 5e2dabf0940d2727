//! Log output for integration tests.
//!
//! The proxy's interesting records (composed addresses, exchange outcomes)
//! come from `harbourmaster_core` at `info`. Tests that want to see them
//! call [`init_test_tracing`]; tests that assert on them use
//! [`capture::RecordCapture`](crate::capture::RecordCapture) instead.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: proxy records plus request spans,
/// without hyper's connection chatter.
const DEFAULT_TEST_FILTER: &str = "harbourmaster_core=debug,tower_http=debug,hyper=warn,info";

/// Route test logs to the harness writer. The first call in a process wins.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .with_test_writer()
        .try_init();
}
