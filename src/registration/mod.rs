//! Registration subsystem.
//!
//! # Data Flow
//! ```text
//! ContextFacade::add_route / add_middleware / add_listener
//!     → LifecycleGate check
//!     → holder.rs (descriptor: name, source, mappings, init parameters)
//!     → ledger.rs (name uniqueness, insertion order)
//!     → handle.rs (registration handle returned to the caller)
//! ```
//!
//! # Design Decisions
//! - Names are unique per kind, independently
//! - A failed add leaves the ledger untouched
//! - Listings are copies, never live views

pub mod handle;
pub mod holder;
pub mod ledger;

pub use handle::{MiddlewareRegistration, RouteRegistration};
pub use holder::{ListenerHolder, MappingTarget, MiddlewareHolder, MiddlewareMapping, RouteHolder};
pub use ledger::{NamedLedger, RegistrationLedger};
