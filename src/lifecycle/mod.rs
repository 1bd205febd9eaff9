//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! ProcessingContext::new()          → Idle
//! first configuration mutation      → Configuring
//! ProcessingContext::start()        → Starting → Running
//! ProcessingContext::stop()         → Stopped
//! start() again                     → Configuring → Starting → Running
//! ```
//!
//! # Design Decisions
//! - Every mutating operation consults the gate before touching anything
//! - Transitions are strictly ordered; skipping a state is an error
//! - A failed start rolls back to Configuring so registrations survive

pub mod gate;

pub use gate::{LifecycleGate, LifecycleState};
