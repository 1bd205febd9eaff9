//! Session layer.
//!
//! # Responsibilities
//! - Establish or resume a session id before the request goes further in
//! - Carry the cookie configuration and tracking modes the facade exposes
//!
//! # Design Decisions
//! - No storage: the layer only identifies sessions
//! - Configuration is swapped atomically, request tasks read it lock-free

pub mod cookie;
pub mod manager;

use std::sync::Arc;

use crate::handler::SharedHandler;

pub use cookie::{CookieSessionLayer, Session};
pub use manager::{SessionCookieConfig, SessionManager, TrackingMode, TrackingModes};

/// A session-establishing stage wrapped around the rest of the chain.
pub trait SessionLayer: Send + Sync {
    fn manager(&self) -> &SessionManager;

    /// Wrap `inner`; the returned handler establishes session state and delegates.
    fn wrap(&self, inner: SharedHandler) -> SharedHandler;
}

/// Builds the session layer used when sessions are enabled but none was set.
pub(crate) fn default_session_layer(
    context_path: &str,
    cookie: SessionCookieConfig,
) -> Arc<dyn SessionLayer> {
    Arc::new(CookieSessionLayer::new(SessionManager::new(cookie)).with_context_path(context_path))
}
