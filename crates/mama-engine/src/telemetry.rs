// mama/crates/mama-engine/src/telemetry.rs

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset or unparsable
const DEFAULT_FILTER: &str = "info";

/// Install the global fmt subscriber. Later calls leave the first one in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing();
        init_tracing();
        tracing::info!("telemetry still works");
    }
}
