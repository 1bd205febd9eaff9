//! Processing context: lifecycle-gated configuration and the composed entry point.
//!
//! # Data Flow
//! ```text
//! Configuration (Idle / Configuring):
//!     host → ProcessingContext setters / add_* → gate check → ledger
//!
//! start():
//!     → Starting: factory.rs ensures session, security, routing layers
//!     → listeners instantiated and notified (may register through the facade)
//!     → pending routes / middleware built, injected, initialized
//!     → assembler.rs links session → security → routing
//!     → routing tables compiled, entry point published → Running
//!
//! Request:
//!     → context path stripped → entry point (lock-free load)
//! ```
//!
//! # Design Decisions
//! - Gate and configuration live under one mutex so check and mutation are atomic
//! - Host callbacks (listeners, injectors, factories, layer `wrap`, `init`,
//!   `destroy`) run without the lock held, so they can call back into the context
//! - The entry point is published through `ArcSwapOption`: requests never lock
//! - A failed start rolls back to Configuring and publishes nothing

pub mod assembler;
pub mod facade;
pub mod factory;
pub mod options;

use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;

use crate::artifact::inject::resolve;
use crate::artifact::{
    ArtifactKind, ContextListener, InitParameters, Injector, ListenerSource, MiddlewareSource,
    RouteSource, TypeRegistry,
};
use crate::config::schema::ContextConfig;
use crate::error::ContextError;
use crate::handler::{not_found, unavailable, Handler};
use crate::lifecycle::{LifecycleGate, LifecycleState};
use crate::observability::metrics;
use crate::registration::{
    ListenerHolder, MiddlewareHolder, MiddlewareRegistration, RouteHolder, RouteRegistration,
};
use crate::routing::router::Retired;
use crate::routing::{DispatchType, DispatcherTypes, PathInContext, PathSpec, RoutingLayer};
use crate::security::{SecurityFactory, SecurityLayer};
use crate::session::{SessionCookieConfig, SessionLayer};

pub use assembler::ComposedHandler;
pub use facade::{ContextFacade, NamedDispatcher, ProtocolVersion, EFFECTIVE_VERSION};
pub use options::{InitParamPolicy, LayerOptions};

/// Mutable configuration of a context, guarded by one lock.
pub(crate) struct ContextState {
    pub(crate) gate: LifecycleGate,
    pub(crate) options: LayerOptions,
    pub(crate) init_param_policy: InitParamPolicy,
    pub(crate) init_params: InitParameters,
    /// Cookie settings for a session layer the context creates itself.
    pub(crate) session_cookie: SessionCookieConfig,
    pub(crate) session: Option<Arc<dyn SessionLayer>>,
    pub(crate) security: Option<Arc<dyn SecurityLayer>>,
    pub(crate) routing: Option<RoutingLayer>,
    pub(crate) security_factory: SecurityFactory,
    pub(crate) injector: Option<Arc<dyn Injector>>,
    pub(crate) types: TypeRegistry,
}

impl ContextState {
    fn new(options: LayerOptions) -> Self {
        Self {
            gate: LifecycleGate::new(),
            options,
            init_param_policy: InitParamPolicy::default(),
            init_params: InitParameters::new(),
            session_cookie: SessionCookieConfig::default(),
            session: None,
            security: None,
            routing: None,
            security_factory: SecurityFactory::default(),
            injector: None,
            types: TypeRegistry::new(),
        }
    }

    /// Gate check for configuration mutation; moves Idle to Configuring.
    pub(crate) fn configure(&mut self, operation: &'static str) -> Result<(), ContextError> {
        self.gate.require_mutable(operation)?;
        self.gate.touch();
        Ok(())
    }
}

pub(crate) struct ContextInner {
    pub(crate) context_path: String,
    state: Mutex<ContextState>,
    entry: ArcSwapOption<ComposedHandler>,
}

impl ContextInner {
    pub(crate) fn lock(&self) -> MutexGuard<'_, ContextState> {
        self.state.lock().expect("context state mutex poisoned")
    }
}

/// A request-processing context mounted at a context path.
///
/// Cheap to clone: clones share the same configuration and entry point.
#[derive(Clone)]
pub struct ProcessingContext {
    pub(crate) inner: Arc<ContextInner>,
}

impl ProcessingContext {
    /// An empty context at `context_path` (`""` or `"/"` for the root).
    pub fn new(context_path: &str, options: LayerOptions) -> Self {
        let context_path = normalize_context_path(context_path);
        tracing::debug!(context_path = %context_path, options = ?options, "Context created");
        Self {
            inner: Arc::new(ContextInner {
                context_path,
                state: Mutex::new(ContextState::new(options)),
                entry: ArcSwapOption::empty(),
            }),
        }
    }

    /// Build a context from the `[context]` section of the host configuration.
    pub fn from_settings(settings: &ContextConfig) -> Result<Self, ContextError> {
        let context = Self::new(
            &settings.context_path,
            LayerOptions::from_flags(settings.sessions, settings.security),
        );
        {
            let mut state = context.inner.lock();
            state.configure("from_settings")?;
            state.init_param_policy = settings.init_param_policy;
            state.init_params = settings.init_parameters.clone();
            state.session_cookie = settings.session.cookie.clone();
        }
        if let Some(modes) = &settings.session.tracking_modes {
            if let Some(session) = context.ensure_session_layer() {
                session.manager().set_tracking_modes(modes.iter().copied().collect());
            }
        }
        Ok(context)
    }

    pub fn context_path(&self) -> &str {
        &self.inner.context_path
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lock().gate.state()
    }

    pub fn is_configuring(&self) -> bool {
        self.inner.lock().gate.is_configuring()
    }

    pub fn is_starting(&self) -> bool {
        self.inner.lock().gate.is_starting()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().gate.is_running()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock().gate.is_stopped()
    }

    pub fn options(&self) -> LayerOptions {
        self.inner.lock().options
    }

    /// The dynamic registration facade bound to this context.
    pub fn facade(&self) -> ContextFacade {
        ContextFacade::new(self.inner.clone())
    }

    /// The published entry point, present while Running.
    pub fn entry_point(&self) -> Option<Arc<ComposedHandler>> {
        self.inner.entry.load_full()
    }

    pub fn set_injector(&self, injector: Arc<dyn Injector>) -> Result<(), ContextError> {
        let mut state = self.inner.lock();
        state.configure("set_injector")?;
        state.injector = Some(injector);
        Ok(())
    }

    pub fn injector(&self) -> Option<Arc<dyn Injector>> {
        self.inner.lock().injector.clone()
    }

    /// Merge type-name factories into the context registry.
    pub fn register_types(&self, types: TypeRegistry) -> Result<(), ContextError> {
        let mut state = self.inner.lock();
        state.configure("register_types")?;
        state.types.extend(types);
        Ok(())
    }

    pub fn set_init_param_policy(&self, policy: InitParamPolicy) -> Result<(), ContextError> {
        let mut state = self.inner.lock();
        state.configure("set_init_param_policy")?;
        state.init_param_policy = policy;
        Ok(())
    }

    /// Context init parameter, set before start regardless of policy.
    pub fn set_init_parameter(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ContextError> {
        let mut state = self.inner.lock();
        state.configure("set_init_parameter")?;
        state.init_params.insert(key.into(), value.into());
        Ok(())
    }

    /// Register a route mapped to `pattern`.
    pub fn add_route(
        &self,
        name: impl Into<String>,
        source: RouteSource,
        pattern: &str,
    ) -> Result<RouteRegistration, ContextError> {
        let name = name.into();
        let spec = PathSpec::parse(pattern)?;
        {
            let mut state = self.inner.lock();
            state.configure("add_route")?;
            let routing = state.ensure_routing();
            let ledger = routing.ledger_mut();
            ledger.add_route(RouteHolder::new(name.clone(), source))?;
            let conflicts = ledger.add_route_mappings(&name, vec![spec])?;
            if !conflicts.is_empty() {
                tracing::warn!(route = %name, conflicts = ?conflicts, "Pattern already mapped to another route");
            }
        }
        metrics::record_registration(ArtifactKind::Route);
        tracing::debug!(route = %name, pattern = %pattern, "Route registered");
        Ok(RouteRegistration::new(self.inner.clone(), name))
    }

    /// Register a middleware mapped to `pattern` for `dispatch`.
    pub fn add_middleware(
        &self,
        name: impl Into<String>,
        source: MiddlewareSource,
        pattern: &str,
        dispatch: DispatcherTypes,
    ) -> Result<MiddlewareRegistration, ContextError> {
        let name = name.into();
        PathSpec::parse(pattern)?;
        {
            let mut state = self.inner.lock();
            state.configure("add_middleware")?;
            state
                .ensure_routing()
                .ledger_mut()
                .add_middleware(MiddlewareHolder::new(name.clone(), source))?;
        }
        metrics::record_registration(ArtifactKind::Middleware);
        tracing::debug!(middleware = %name, pattern = %pattern, "Middleware registered");
        let registration = MiddlewareRegistration::new(self.inner.clone(), name);
        registration.add_mapping_for_paths(&[pattern], dispatch)?;
        Ok(registration)
    }

    pub fn add_listener(&self, source: ListenerSource) -> Result<(), ContextError> {
        {
            let mut state = self.inner.lock();
            state.configure("add_listener")?;
            state.ensure_routing().ledger_mut().add_listener(ListenerHolder::new(source));
        }
        metrics::record_registration(ArtifactKind::Listener);
        Ok(())
    }

    /// Run the start sequence. On failure the context is back in Configuring
    /// with no entry point published.
    pub fn start(&self) -> Result<(), ContextError> {
        {
            let mut state = self.inner.lock();
            if matches!(state.gate.state(), LifecycleState::Idle | LifecycleState::Stopped) {
                state.gate.transition(LifecycleState::Configuring)?;
            }
            state.gate.transition(LifecycleState::Starting)?;
        }

        let started = Instant::now();
        match self.run_start_sequence() {
            Ok(()) => {
                tracing::info!(
                    context_path = %self.inner.context_path,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Context started"
                );
                Ok(())
            }
            Err(err) => {
                self.abort_start(&err);
                Err(err)
            }
        }
    }

    fn run_start_sequence(&self) -> Result<(), ContextError> {
        self.ensure_session_layer();
        self.ensure_security_layer()?;
        self.inner.lock().ensure_routing();

        self.notify_listeners_initialized()?;
        self.materialize_pending()?;

        // Layers wrap outside the lock; only compile and publish under it.
        let (routing, security, session) = {
            let mut state = self.inner.lock();
            let routing = state.ensure_routing().handler();
            (routing, state.security.clone(), state.session.clone())
        };
        let composed = assembler::assemble(routing, security.as_deref(), session.as_deref());

        let mut state = self.inner.lock();
        state.ensure_routing().initialize();
        self.inner.entry.store(Some(Arc::new(composed)));
        state.gate.transition(LifecycleState::Running)?;
        Ok(())
    }

    /// Instantiate listeners one at a time and call `context_initialized`.
    /// Listeners added by earlier listeners are picked up by index.
    fn notify_listeners_initialized(&self) -> Result<(), ContextError> {
        let facade = self.facade();
        let mut index = 0;
        loop {
            let (resolved, injector) = {
                let state = self.inner.lock();
                let Some(holder) = state
                    .routing
                    .as_ref()
                    .and_then(|routing| routing.ledger().listeners().get(index))
                else {
                    break;
                };
                (resolve(holder.source(), &state.types)?, state.injector.clone())
            };

            let listener: Arc<dyn ContextListener> = resolved.finish(injector.as_deref())?;
            {
                let mut state = self.inner.lock();
                if let Some(holder) = state
                    .routing
                    .as_mut()
                    .and_then(|routing| routing.ledger_mut().listeners_mut().get_mut(index))
                {
                    holder.instance = Some(listener.clone());
                }
            }

            listener
                .context_initialized(&facade)
                .map_err(|source| ContextError::Startup {
                    kind: ArtifactKind::Listener,
                    source,
                })?;
            index += 1;
        }
        Ok(())
    }

    /// Build every route and middleware that has no instance yet.
    fn materialize_pending(&self) -> Result<(), ContextError> {
        loop {
            let (pending, injector) = {
                let state = self.inner.lock();
                let Some(routing) = state.routing.as_ref() else {
                    return Ok(());
                };
                (routing.pending(&state.types)?, state.injector.clone())
            };
            if pending.is_empty() {
                return Ok(());
            }

            let mut built = Vec::with_capacity(pending.len());
            let mut failure = None;
            for artifact in pending {
                match artifact.build(injector.as_deref()) {
                    Ok(artifact) => built.push(artifact),
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }

            // Install what was built so a rollback destroys it.
            if let Some(routing) = self.inner.lock().routing.as_mut() {
                routing.install(built);
            }
            if let Some(err) = failure {
                return Err(err);
            }
        }
    }

    fn abort_start(&self, err: &ContextError) {
        tracing::error!(context_path = %self.inner.context_path, error = %err, "Context start failed");
        metrics::record_start_failure();

        self.inner.entry.store(None);
        let retired = {
            let mut state = self.inner.lock();
            let retired = match state.routing.as_mut() {
                Some(routing) => {
                    for holder in routing.ledger_mut().listeners_mut() {
                        holder.instance = None;
                    }
                    routing.shutdown()
                }
                None => Retired::none(),
            };
            if state.gate.is_starting() {
                // Starting → Configuring is always legal.
                let _ = state.gate.transition(LifecycleState::Configuring);
            }
            retired
        };
        retired.destroy();
    }

    /// Running → Stopped. Unpublishes the entry point, destroys routes and
    /// middleware, then notifies listeners in reverse order.
    pub fn stop(&self) -> Result<(), ContextError> {
        let (retired, listeners) = {
            let mut state = self.inner.lock();
            state.gate.transition(LifecycleState::Stopped)?;
            self.inner.entry.store(None);
            match state.routing.as_mut() {
                Some(routing) => {
                    let listeners = routing
                        .ledger_mut()
                        .listeners_mut()
                        .iter_mut()
                        .filter_map(|holder| holder.instance.take())
                        .collect::<Vec<_>>();
                    (routing.shutdown(), listeners)
                }
                None => (Retired::none(), Vec::new()),
            }
        };

        retired.destroy();
        let facade = self.facade();
        for listener in listeners.iter().rev() {
            listener.context_destroyed(&facade);
        }
        tracing::info!(context_path = %self.inner.context_path, "Context stopped");
        Ok(())
    }

    /// The path within this context, or `None` if `path` lies outside it.
    pub fn path_in_context(&self, path: &str) -> Option<String> {
        let context_path = &self.inner.context_path;
        if context_path.is_empty() {
            return Some(path.to_string());
        }
        let rest = path.strip_prefix(context_path.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest.to_string())
        } else {
            None
        }
    }

    /// Drive one request through the composed entry point.
    pub fn handle(&self, mut request: Request<Body>) -> BoxFuture<'static, Response> {
        let Some(path) = self.path_in_context(request.uri().path()) else {
            return Box::pin(async { not_found() });
        };
        let Some(entry) = self.inner.entry.load_full() else {
            return Box::pin(async { unavailable() });
        };

        request.extensions_mut().insert(PathInContext(path));
        request.extensions_mut().insert(DispatchType::Request);

        let started = Instant::now();
        let future = entry.handle(request);
        Box::pin(async move {
            let response = future.await;
            metrics::record_request(response.status().as_u16(), started);
            response
        })
    }
}

impl tower::Service<Request<Body>> for ProcessingContext {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let future = self.handle(request);
        Box::pin(async move { Ok(future.await) })
    }
}

fn normalize_context_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
