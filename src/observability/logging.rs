//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Pick the log filter from the environment, falling back to config
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when neither `RUST_LOG` nor a configured level is usable.
pub const DEFAULT_FILTER: &str = "context_handler=debug,tower_http=debug";

/// Filter directive for a configured level such as `"info"`.
pub fn filter_for(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        DEFAULT_FILTER.to_string()
    } else {
        format!("context_handler={level},tower_http={level}")
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(level).into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
