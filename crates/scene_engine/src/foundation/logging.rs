//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
///
/// Safe to call more than once; only the first call installs a logger.
pub fn init() {
    let _ = env_logger::try_init();
}

/// Initialize logging, falling back to `filter` when `RUST_LOG` is unset
pub fn init_with_filter(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_with_filter("debug");
        init();
        info!("logger installed twice without panicking");
    }
}
