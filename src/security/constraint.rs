//! Path-constraint security layer.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use futures_util::future::BoxFuture;

use crate::error::ContextError;
use crate::handler::{status_response, Handler, SharedHandler};
use crate::routing::{PathInContext, PathMap, PathSpec};
use crate::security::SecurityLayer;

/// Outcome of a matching constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Permit,
    Deny,
}

/// Permits or denies requests by the most specific matching path constraint.
///
/// Unconstrained paths are permitted.
#[derive(Default, Clone)]
pub struct ConstraintSecurityLayer {
    constraints: Arc<PathMap<Constraint>>,
    specs: Vec<(PathSpec, Constraint)>,
}

impl ConstraintSecurityLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint for a URL pattern; a repeated pattern replaces the earlier one.
    pub fn with_constraint(mut self, pattern: &str, constraint: Constraint) -> Result<Self, ContextError> {
        let spec = PathSpec::parse(pattern)?;
        self.specs.retain(|(s, _)| *s != spec);
        self.specs.push((spec, constraint));

        let mut map = PathMap::new();
        for (spec, constraint) in &self.specs {
            map.insert(spec, *constraint);
        }
        self.constraints = Arc::new(map);
        Ok(self)
    }

    pub fn constraints(&self) -> &[(PathSpec, Constraint)] {
        &self.specs
    }

    /// The constraint governing `path`.
    pub fn evaluate(&self, path: &str) -> Constraint {
        self.constraints
            .lookup(path)
            .copied()
            .unwrap_or(Constraint::Permit)
    }
}

impl SecurityLayer for ConstraintSecurityLayer {
    fn wrap(&self, inner: SharedHandler) -> SharedHandler {
        Arc::new(ConstraintHandler {
            layer: self.clone(),
            inner,
        })
    }
}

struct ConstraintHandler {
    layer: ConstraintSecurityLayer,
    inner: SharedHandler,
}

impl Handler for ConstraintHandler {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        let path = request
            .extensions()
            .get::<PathInContext>()
            .map(|p| p.0.as_str())
            .unwrap_or_else(|| request.uri().path());

        match self.layer.evaluate(path) {
            Constraint::Permit => self.inner.handle(request),
            Constraint::Deny => {
                tracing::debug!(path = %path, "Request denied by security constraint");
                Box::pin(async { status_response(StatusCode::FORBIDDEN, "Forbidden") })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use axum::response::IntoResponse;

    #[test]
    fn test_most_specific_wins() {
        let layer = ConstraintSecurityLayer::new()
            .with_constraint("/admin/*", Constraint::Deny)
            .unwrap()
            .with_constraint("/admin/health", Constraint::Permit)
            .unwrap();

        assert_eq!(layer.evaluate("/admin/users"), Constraint::Deny);
        assert_eq!(layer.evaluate("/admin/health"), Constraint::Permit);
        assert_eq!(layer.evaluate("/public"), Constraint::Permit);
        assert_eq!(layer.constraints().len(), 2);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = ConstraintSecurityLayer::new()
            .with_constraint("admin", Constraint::Deny)
            .err()
            .unwrap();
        assert!(matches!(err, ContextError::InvalidPathSpec(_)));
    }

    #[tokio::test]
    async fn test_deny_short_circuits() {
        let layer = ConstraintSecurityLayer::new()
            .with_constraint("/secret/*", Constraint::Deny)
            .unwrap();
        let handler = layer.wrap(handler_fn(|_req| async { "ok".into_response() }));

        let req = Request::builder().uri("/secret/x").body(Body::empty()).unwrap();
        assert_eq!(handler.handle(req).await.status(), StatusCode::FORBIDDEN);

        let req = Request::builder().uri("/open").body(Body::empty()).unwrap();
        assert_eq!(handler.handle(req).await.status(), StatusCode::OK);
    }
}
