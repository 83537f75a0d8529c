#![allow(dead_code)]

pub mod capture;
pub mod mock_h2_server;
pub mod mock_proxy;
pub mod mock_server;
pub mod tls;

/// Install a test subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("guise=debug")
        .with_test_writer()
        .try_init();
}
