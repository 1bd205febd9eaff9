//! Dynamic registration facade.
//!
//! # Responsibilities
//! - Add routes, middleware and listeners on behalf of deferred startup code
//! - Construct artifacts through the type registry and injection hook
//! - Expose registrations, init parameters and session settings
//!
//! # Design Decisions
//! - Bound to the context through a shared reference, not nested capture
//! - Routes, listeners and init parameters: Starting only
//! - Middleware: any time before Running
//! - Construction failures come back as `ConstructionError`, never raw

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;

use crate::artifact::inject::{resolve, Artifact};
use crate::artifact::{
    ArtifactKind, ArtifactSource, ContextListener, ListenerSource, Middleware, MiddlewareSource,
    Route, RouteSource,
};
use crate::context::{ContextInner, InitParamPolicy};
use crate::error::ContextError;
use crate::handler::{not_found, unavailable};
use crate::lifecycle::LifecycleState;
use crate::observability::metrics;
use crate::registration::{
    ListenerHolder, MiddlewareHolder, MiddlewareRegistration, RouteHolder, RouteRegistration,
};
use crate::routing::{DispatchTable, DispatchType};
use crate::session::{SessionCookieConfig, SessionLayer, TrackingModes};

/// Protocol version this context reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

pub const EFFECTIVE_VERSION: ProtocolVersion = ProtocolVersion { major: 3, minor: 0 };

/// Configuration port of a [`ProcessingContext`](crate::context::ProcessingContext).
#[derive(Clone)]
pub struct ContextFacade {
    inner: Arc<ContextInner>,
}

impl ContextFacade {
    pub(crate) fn new(inner: Arc<ContextInner>) -> Self {
        Self { inner }
    }

    pub fn context_path(&self) -> &str {
        &self.inner.context_path
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lock().gate.state()
    }

    pub fn effective_version(&self) -> ProtocolVersion {
        EFFECTIVE_VERSION
    }

    // Registration

    /// Register a route while the context is starting. Map it through the
    /// returned handle.
    pub fn add_route(
        &self,
        name: impl Into<String>,
        source: RouteSource,
    ) -> Result<RouteRegistration, ContextError> {
        let name = name.into();
        {
            let mut state = self.inner.lock();
            state.gate.require_starting("add_route")?;
            state
                .ensure_routing()
                .ledger_mut()
                .add_route(RouteHolder::new(name.clone(), source))?;
        }
        metrics::record_registration(ArtifactKind::Route);
        tracing::debug!(route = %name, "Route registered during startup");
        Ok(RouteRegistration::new(self.inner.clone(), name))
    }

    /// Register a middleware at any point before the context runs.
    pub fn add_middleware(
        &self,
        name: impl Into<String>,
        source: MiddlewareSource,
    ) -> Result<MiddlewareRegistration, ContextError> {
        let name = name.into();
        {
            let mut state = self.inner.lock();
            state.configure("add_middleware")?;
            state
                .ensure_routing()
                .ledger_mut()
                .add_middleware(MiddlewareHolder::new(name.clone(), source))?;
        }
        metrics::record_registration(ArtifactKind::Middleware);
        tracing::debug!(middleware = %name, "Middleware registered");
        Ok(MiddlewareRegistration::new(self.inner.clone(), name))
    }

    /// Register a listener while the context is starting. It is notified
    /// before the start completes.
    pub fn add_listener(&self, source: ListenerSource) -> Result<(), ContextError> {
        {
            let mut state = self.inner.lock();
            state.gate.require_starting("add_listener")?;
            state
                .ensure_routing()
                .ledger_mut()
                .add_listener(ListenerHolder::new(source));
        }
        metrics::record_registration(ArtifactKind::Listener);
        Ok(())
    }

    // Construction

    fn create<T: Artifact + ?Sized>(&self, source: &ArtifactSource<T>) -> Result<Arc<T>, ContextError> {
        let (resolved, injector) = {
            let state = self.inner.lock();
            (resolve(source, &state.types)?, state.injector.clone())
        };
        Ok(resolved.finish(injector.as_deref())?)
    }

    /// Build a route through the registry and injection hook. Instances are
    /// returned untouched.
    pub fn create_route(&self, source: &RouteSource) -> Result<Arc<dyn Route>, ContextError> {
        self.create(source)
    }

    pub fn create_middleware(
        &self,
        source: &MiddlewareSource,
    ) -> Result<Arc<dyn Middleware>, ContextError> {
        self.create(source)
    }

    pub fn create_listener(
        &self,
        source: &ListenerSource,
    ) -> Result<Arc<dyn ContextListener>, ContextError> {
        self.create(source)
    }

    // Queries

    pub fn route_registration(&self, name: &str) -> Option<RouteRegistration> {
        let state = self.inner.lock();
        state
            .routing
            .as_ref()?
            .ledger()
            .route(name)
            .map(|holder| RouteRegistration::new(self.inner.clone(), holder.name().to_string()))
    }

    pub fn middleware_registration(&self, name: &str) -> Option<MiddlewareRegistration> {
        let state = self.inner.lock();
        state
            .routing
            .as_ref()?
            .ledger()
            .middleware(name)
            .map(|holder| MiddlewareRegistration::new(self.inner.clone(), holder.name().to_string()))
    }

    /// Every route registration, in insertion order.
    pub fn route_registrations(&self) -> Vec<RouteRegistration> {
        let names = self
            .inner
            .lock()
            .routing
            .as_ref()
            .map(|routing| routing.ledger().route_names())
            .unwrap_or_default();
        names
            .into_iter()
            .map(|name| RouteRegistration::new(self.inner.clone(), name))
            .collect()
    }

    pub fn middleware_registrations(&self) -> Vec<MiddlewareRegistration> {
        let names = self
            .inner
            .lock()
            .routing
            .as_ref()
            .map(|routing| routing.ledger().middleware_names())
            .unwrap_or_default();
        names
            .into_iter()
            .map(|name| MiddlewareRegistration::new(self.inner.clone(), name))
            .collect()
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .lock()
            .routing
            .as_ref()
            .map_or(0, |routing| routing.ledger().listener_count())
    }

    /// Dispatcher for a registered route, or `None` if there is none by that name.
    pub fn named_dispatcher(&self, name: &str) -> Option<NamedDispatcher> {
        let state = self.inner.lock();
        let routing = state.routing.as_ref()?;
        routing.ledger().route(name)?;
        Some(NamedDispatcher {
            name: name.to_string(),
            table: routing.table_slot(),
        })
    }

    // Init parameters

    pub fn init_parameter(&self, key: &str) -> Option<String> {
        self.inner.lock().init_params.get(key).cloned()
    }

    pub fn init_parameter_names(&self) -> Vec<String> {
        self.inner.lock().init_params.keys().cloned().collect()
    }

    /// Set a context init parameter while starting.
    ///
    /// An existing key is kept (`Ok(false)`) under [`InitParamPolicy::Reject`]
    /// and replaced under [`InitParamPolicy::Overwrite`].
    pub fn set_init_parameter(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<bool, ContextError> {
        let key = key.into();
        let mut state = self.inner.lock();
        state.gate.require_starting("set_init_parameter")?;
        if state.init_params.contains_key(&key) && state.init_param_policy == InitParamPolicy::Reject {
            tracing::debug!(key = %key, "Init parameter already set, keeping existing value");
            return Ok(false);
        }
        state.init_params.insert(key, value.into());
        Ok(true)
    }

    // Session settings

    /// `None` without a session layer.
    pub fn default_session_tracking_modes(&self) -> Option<TrackingModes> {
        let session = self.inner.lock().session.clone()?;
        Some(session.manager().default_tracking_modes())
    }

    pub fn effective_session_tracking_modes(&self) -> Option<TrackingModes> {
        let session = self.inner.lock().session.clone()?;
        Some(session.manager().effective_tracking_modes())
    }

    /// Starting only; ignored without a session layer.
    pub fn set_session_tracking_modes(&self, modes: TrackingModes) -> Result<(), ContextError> {
        if let Some(session) = self.starting_session("set_session_tracking_modes")? {
            session.manager().set_tracking_modes(modes);
        }
        Ok(())
    }

    pub fn session_cookie_config(&self) -> Option<SessionCookieConfig> {
        let session = self.inner.lock().session.clone()?;
        Some((*session.manager().cookie_config()).clone())
    }

    /// Starting only; ignored without a session layer.
    pub fn set_session_cookie_config(&self, config: SessionCookieConfig) -> Result<(), ContextError> {
        if let Some(session) = self.starting_session("set_session_cookie_config")? {
            session.manager().set_cookie_config(config);
        }
        Ok(())
    }

    /// The session layer, once the gate confirms Starting. The layer is used
    /// after the lock is released.
    fn starting_session(
        &self,
        operation: &'static str,
    ) -> Result<Option<Arc<dyn SessionLayer>>, ContextError> {
        let state = self.inner.lock();
        state.gate.require_starting(operation)?;
        Ok(state.session.clone())
    }
}

/// Drives one named route directly, bypassing path resolution.
pub struct NamedDispatcher {
    name: String,
    table: Arc<ArcSwapOption<DispatchTable>>,
}

impl NamedDispatcher {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dispatch as a forward: route-name middleware mapped for FORWARD run first.
    pub fn forward(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        self.dispatch(request, DispatchType::Forward)
    }

    pub fn include(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        self.dispatch(request, DispatchType::Include)
    }

    fn dispatch(&self, request: Request<Body>, dispatch: DispatchType) -> BoxFuture<'static, Response> {
        let Some(table) = self.table.load_full() else {
            return Box::pin(async { unavailable() });
        };
        table
            .dispatch_named(&self.name, request, dispatch)
            .unwrap_or_else(|| -> BoxFuture<'static, Response> { Box::pin(async { not_found() }) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{LayerOptions, ProcessingContext};

    #[test]
    fn test_starting_only_operations_fail_while_configuring() {
        let context = ProcessingContext::new("", LayerOptions::SESSIONS);
        let facade = context.facade();

        assert!(facade.add_route("r", RouteSource::named("x")).unwrap_err().is_illegal_state());
        assert!(facade.add_listener(ListenerSource::named("x")).unwrap_err().is_illegal_state());
        assert!(facade.set_init_parameter("k", "v").unwrap_err().is_illegal_state());
        assert!(facade
            .set_session_tracking_modes(TrackingModes::new())
            .unwrap_err()
            .is_illegal_state());

        // Middleware is tolerated before the start.
        assert!(facade.add_middleware("m", MiddlewareSource::named("x")).is_ok());
        assert_eq!(facade.middleware_registrations().len(), 1);
    }

    #[test]
    fn test_session_queries_without_session_layer() {
        let context = ProcessingContext::new("/app", LayerOptions::empty());
        let facade = context.facade();
        assert_eq!(facade.context_path(), "/app");
        assert!(facade.default_session_tracking_modes().is_none());
        assert!(facade.session_cookie_config().is_none());
        assert_eq!(facade.effective_version().to_string(), "3.0");
    }

    #[test]
    fn test_named_dispatcher_requires_registration() {
        let context = ProcessingContext::new("", LayerOptions::empty());
        let facade = context.facade();
        assert!(facade.named_dispatcher("r").is_none());

        context.add_route("r", RouteSource::named("x"), "/r").unwrap();
        assert_eq!(facade.named_dispatcher("r").unwrap().name(), "r");
    }
}
