//! Processing context for an embeddable HTTP server.
//!
//! A [`ProcessingContext`] gates configuration by its lifecycle, composes the
//! optional session and security layers around a routing layer into one entry
//! point, and exposes a [`ContextFacade`] through which routes, middleware and
//! listeners are registered, also by code running during startup.
//!
//! # Architecture Overview
//!
//! ```text
//!   host setup ──▶ ProcessingContext ──▶ LifecycleGate ──▶ RegistrationLedger
//!                        │
//!                  start()│  Layer factory: session? security? routing
//!                        ▼
//!     request ──▶ [session] ──▶ [security] ──▶ routing ──▶ middleware ──▶ route
//! ```

// Core
pub mod artifact;
pub mod context;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod registration;

// Layers
pub mod routing;
pub mod security;
pub mod session;

// Host
pub mod config;
pub mod http;
pub mod observability;

pub use artifact::{
    ContextListener, Factory, Injector, ListenerSource, Middleware, MiddlewareSource, Route,
    RouteSource, TypeRegistry,
};
pub use config::HostConfig;
pub use context::{ContextFacade, LayerOptions, ProcessingContext};
pub use error::{ConstructionError, ContextError};
pub use http::HttpServer;
pub use lifecycle::LifecycleState;
