//! Logger setup
//!
//! The engine logs through the `log` macros. Binaries embedding it call
//! [`init`] once; `RUST_LOG` overrides the default `info` level.

use env_logger::{Builder, Env};

/// Install the global logger
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Logger for unit tests, captured by the test harness
pub fn init_for_tests() {
    let _ = Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_for_tests();
        init_for_tests();
        init();
        log::debug!("logger installed");
    }
}
