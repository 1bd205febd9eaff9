//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request from the session layer:
//!     → constraint.rs (most specific path constraint)
//!     → Deny: 403, routing never runs
//!     → Permit / unconstrained: pass to routing
//! ```
//!
//! # Design Decisions
//! - Policy evaluation is pluggable: the context only needs `wrap`
//! - The default implementation is chosen per context through a factory,
//!   never through process-wide state
//! - Fail closed: a factory that cannot build aborts the start

pub mod constraint;

use crate::artifact::Factory;
use crate::handler::SharedHandler;

pub use constraint::{Constraint, ConstraintSecurityLayer};

/// An authorization stage wrapped around the routing layer.
pub trait SecurityLayer: Send + Sync {
    /// Wrap `inner`; the returned handler delegates when the request is authorized.
    fn wrap(&self, inner: SharedHandler) -> SharedHandler;
}

/// Builds the security layer when security is enabled and none was set.
pub type SecurityFactory = Factory<dyn SecurityLayer>;

impl Factory<dyn SecurityLayer> {
    /// Factory that default-constructs `R`.
    pub fn of<R: SecurityLayer + Default + 'static>() -> Self {
        Self::new(std::any::type_name::<R>(), || {
            Ok(Box::new(R::default()) as Box<dyn SecurityLayer>)
        })
    }
}

impl Default for SecurityFactory {
    fn default() -> Self {
        Self::of::<ConstraintSecurityLayer>()
    }
}
