/// Logging setup for the headless runner
///
/// Library code only talks to the `log` facade (`debug!`, `info!`, `warn!`),
/// so embedding applications keep control over where records go. The runner
/// installs `env_logger` through [`init`], honouring `RUST_LOG` and falling
/// back to `info` when it is unset.
///
/// # Examples
///
/// ```rust
/// rail_sim::logging::init();
/// log::info!("Loaded {} lines", 3);
/// ```
use env_logger::Env;

/// Install the process-wide logger. Safe to call more than once.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Install a logger that captures output for the test harness
#[cfg(test)]
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
