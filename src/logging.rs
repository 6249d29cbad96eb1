//! Process-wide tracing subscriber.
//!
//! The protocol crates log through the `log` facade; `tracing-log` bridges
//! those records into the same subscriber, so one filter governs both.

use crate::settings::LogSettings;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Env var that overrides the configured filter (`EnvFilter` syntax).
pub const LOG_ENV: &str = "REMFS_LOG";

/// Build the filter: `REMFS_LOG` when set and valid, else the settings level.
pub fn filter_from(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns `false` when one was already set,
/// which happens with repeated calls and in tests.
pub fn init(settings: &LogSettings) -> bool {
    let format_layer = if settings.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(filter_from(settings))
        .with(format_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        let settings = LogSettings::default();
        let _ = init(&settings);
        assert!(!init(&settings));
    }

    #[test]
    fn bad_level_falls_back() {
        let settings = LogSettings {
            level: "remfs=verbose".into(),
            json: false,
        };
        // Only meaningful when REMFS_LOG is not set in the test environment.
        if std::env::var(LOG_ENV).is_err() {
            assert_eq!(filter_from(&settings).to_string(), "info");
        }
    }
}
