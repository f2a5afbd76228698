//! Logging setup for the injection thread.
//!
//! Events are emitted through `tracing` everywhere in the crate. The unit is loaded into a
//! foreign process that may already carry a subscriber, so installation never panics: if a
//! global subscriber exists, it keeps receiving our events.
//!
//! # Usage
//!
//! ```rust
//! use jvminject::logger;
//!
//! logger::init();
//! tracing::info!("Starting");
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Every strategy attempt and foreign call result
    Debug,
    /// Branch decisions
    #[default]
    Info,
    /// Fallbacks
    Warn,
    /// Fatal failures only
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Initialize logging at INFO level.
pub fn init() {
    init_with_level(LogLevel::Info);
}

/// Initialize logging at the given level.
///
/// Returns `false` if another subscriber was already installed.
pub fn init_with_level(level: LogLevel) -> bool {
    let filter = tracing_subscriber::filter::LevelFilter::from_level(level.into());

    let layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_level(true)
        .with_ansi(false)
        .compact()
        .with_filter(filter);

    Registry::default().with(layer).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(tracing::Level::from(LogLevel::Debug), tracing::Level::DEBUG);
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_repeated_init_does_not_panic() {
        init_with_level(LogLevel::Debug);
        assert!(!init_with_level(LogLevel::Info));
    }
}
