//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, EnvFilter)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Lifecycle transitions, registrations and start failures are always logged
//! - Metrics are cheap (atomic increments); with no recorder installed they are no-ops

pub mod logging;
pub mod metrics;
