//! Logger initialisation for the binary.

use log::debug;

/// Filter used when neither `RUST_LOG` nor `log_level` is set.
pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";

/// Install `env_logger`; `RUST_LOG` takes precedence over `level`.
pub(crate) fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if let Err(err) = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
    {
        debug!("logger already installed: {err}");
    }
}
