//! Tracing setup. Diagnostics go to stderr; stdout carries the event stream.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Filter directive for `level`, scoped to this crate. Unknown levels fall back to `info`.
pub fn filter_directive(level: &str) -> String {
    let level = if LOG_LEVELS.contains(&level) {
        level
    } else {
        "info"
    };
    format!("clubgate={level}")
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::new(filter_directive(level));

    match format {
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr));
            let _ = subscriber.try_init();
        }
        LogFormat::Text => {
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr));
            let _ = subscriber.try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_scopes_to_crate() {
        assert_eq!(filter_directive("debug"), "clubgate=debug");
        assert_eq!(filter_directive("off"), "clubgate=off");
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(filter_directive("loud"), "clubgate=info");
    }

    #[test]
    fn init_twice_is_harmless() {
        init_tracing("warn", LogFormat::Text);
        init_tracing("debug", LogFormat::Json);
    }
}
