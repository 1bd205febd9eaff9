//! Routing subsystem: the innermost layer of the chain.
//!
//! # Data Flow
//! ```text
//! Incoming request (path in context, dispatch type)
//!     → router.rs (DispatchTable::resolve: exact → longest prefix → suffix → default)
//!     → chain.rs (middleware selected by path / route name / dispatch type)
//!     → Route::handle, or 404 when nothing matched
//!
//! Table compilation (at start):
//!     RegistrationLedger (routes, middleware)
//!     → materialize instances, init with their parameters
//!     → compile PathMap + middleware mappings
//!     → publish as immutable DispatchTable
//! ```
//!
//! # Design Decisions
//! - Tables compiled at start, immutable while running (no read-side locking)
//! - No regex in the hot path: URL patterns only
//! - Deterministic: same path always resolves to the same route

pub mod chain;
pub mod dispatch;
pub mod matcher;
pub mod router;

pub use chain::Next;
pub use dispatch::{DispatchType, DispatcherTypes, PathInContext};
pub use matcher::{PathMap, PathSpec};
pub use router::{CompiledRoute, DispatchTable, RoutingLayer};
