//! Structured logging setup: compact by default, verbose under a flag.

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .compact();

    if verbose {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
