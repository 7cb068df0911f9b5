//! Tracing subscriber setup for hosts embedding the drawing session

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable that overrides the configured filter
pub const LOG_ENV: &str = "INKBOARD_LOG";

/// Install a global fmt subscriber.
///
/// `INKBOARD_LOG` takes precedence over `default_filter`. Returns false if a
/// global subscriber was already installed.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();
    if installed {
        tracing::info!("drawing session logging initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("inkboard=debug");
        assert!(!init("inkboard=debug"));
    }
}
