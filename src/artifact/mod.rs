//! Artifacts: the routes, middleware and listeners a context hosts.
//!
//! # Data Flow
//! ```text
//! ArtifactSource::{Class, Name, Instance}
//!     → registry.rs (Name → Factory)
//!     → Factory::build()
//!     → inject.rs (Injector hook, freshly built instances only)
//!     → Arc<dyn Route | dyn Middleware | dyn ContextListener>
//! ```
//!
//! # Design Decisions
//! - One construction path for all three kinds instead of one per overload
//! - Type names resolve through a host-supplied registry, never reflection
//! - Caller-supplied instances are passed through untouched

pub mod inject;
pub mod registry;
pub mod source;

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;

use crate::context::ContextFacade;
use crate::error::BoxError;
use crate::routing::chain::Next;

pub use inject::Injector;
pub use registry::TypeRegistry;
pub use source::{
    ArtifactSource, Factory, ListenerSource, MiddlewareSource, RouteSource, SourceKind,
};

/// Initialization parameters attached to a registration.
pub type InitParameters = BTreeMap<String, String>;

/// The kinds of object the context constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Route,
    Middleware,
    Listener,
    SecurityLayer,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Route => "route",
            ArtifactKind::Middleware => "middleware",
            ArtifactKind::Listener => "listener",
            ArtifactKind::SecurityLayer => "security layer",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upcast to [`Any`] so hosts and injectors can reach the concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A request target mapped by path.
pub trait Route: AsAny + Send + Sync {
    /// Called once per start, before the route can receive requests.
    fn init(&self, _params: &InitParameters) -> Result<(), BoxError> {
        Ok(())
    }

    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response>;

    /// Called once per stop.
    fn destroy(&self) {}
}

/// A filter around route dispatch, selected by path or route name and dispatch type.
pub trait Middleware: AsAny + Send + Sync {
    fn init(&self, _params: &InitParameters) -> Result<(), BoxError> {
        Ok(())
    }

    /// Process the request; call `next.run(request)` to continue the chain.
    fn call(&self, request: Request<Body>, next: Next) -> BoxFuture<'static, Response>;

    fn destroy(&self) {}
}

/// Observer of the context lifecycle.
///
/// `context_initialized` runs while the context is Starting, so listeners may
/// register routes, middleware and further listeners through the facade.
pub trait ContextListener: AsAny + Send + Sync {
    fn context_initialized(&self, _context: &ContextFacade) -> Result<(), BoxError> {
        Ok(())
    }

    fn context_destroyed(&self, _context: &ContextFacade) {}
}

macro_rules! downcast_impl {
    ($($t:ident),*) => {$(
        impl dyn $t {
            pub fn downcast_ref<T: $t>(&self) -> Option<&T> {
                self.as_any().downcast_ref::<T>()
            }

            pub fn downcast_mut<T: $t>(&mut self) -> Option<&mut T> {
                self.as_any_mut().downcast_mut::<T>()
            }
        }
    )*};
}

downcast_impl!(Route, Middleware, ContextListener);
