//! Chain assembly.
//!
//! Links the routing handler with the optional security and session layers
//! into one entry point. The order is fixed: session, then security, then
//! routing, since session identity may feed security decisions.

use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;

use crate::handler::{Handler, SharedHandler};
use crate::security::SecurityLayer;
use crate::session::SessionLayer;

/// Stage names, outermost first.
pub const SESSION_STAGE: &str = "session";
pub const SECURITY_STAGE: &str = "security";
pub const ROUTING_STAGE: &str = "routing";

/// The entry point of a running context. Built once per start, never mutated.
pub struct ComposedHandler {
    entry: SharedHandler,
    stages: Vec<&'static str>,
}

impl ComposedHandler {
    /// Stage names, outermost first.
    pub fn stages(&self) -> &[&'static str] {
        &self.stages
    }
}

impl Handler for ComposedHandler {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        self.entry.handle(request)
    }
}

/// Wrap `routing` in security, then wrap the result in session.
pub fn assemble(
    routing: SharedHandler,
    security: Option<&dyn SecurityLayer>,
    session: Option<&dyn SessionLayer>,
) -> ComposedHandler {
    let mut handler = routing;
    let mut stages = vec![ROUTING_STAGE];

    if let Some(security) = security {
        handler = security.wrap(handler);
        stages.insert(0, SECURITY_STAGE);
    }
    if let Some(session) = session {
        handler = session.wrap(handler);
        stages.insert(0, SESSION_STAGE);
    }

    tracing::debug!(stages = ?stages, "Handler chain assembled");
    ComposedHandler {
        entry: handler,
        stages,
    }
}
