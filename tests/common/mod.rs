//! Shared probes and helpers for integration testing.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;

use context_handler::artifact::InitParameters;
use context_handler::context::ContextFacade;
use context_handler::error::BoxError;
use context_handler::handler::{Handler, SharedHandler};
use context_handler::routing::Next;
use context_handler::security::SecurityLayer;
use context_handler::session::{SessionLayer, SessionManager};
use context_handler::{ContextListener, Injector, Middleware, Route, RouteSource};

/// Ordered record of probe side effects.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Route answering with its label, or with the value an injector set.
#[derive(Default)]
pub struct Echo {
    pub injected: Option<String>,
}

impl Route for Echo {
    fn handle(&self, _request: Request<Body>) -> BoxFuture<'static, Response> {
        let body = self.injected.clone().unwrap_or_else(|| "echo".to_string());
        Box::pin(async move { body.into_response() })
    }
}

/// Route answering with a fixed label.
pub struct Labeled(pub &'static str);

impl Route for Labeled {
    fn handle(&self, _request: Request<Body>) -> BoxFuture<'static, Response> {
        let label = self.0;
        Box::pin(async move { label.into_response() })
    }
}

/// Route that records "routing" and answers with the init parameters it saw.
pub struct ProbeRoute {
    pub trace: Trace,
    pub params: Mutex<InitParameters>,
    pub destroyed: AtomicUsize,
}

impl ProbeRoute {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            params: Mutex::new(InitParameters::new()),
            destroyed: AtomicUsize::new(0),
        }
    }
}

impl Route for ProbeRoute {
    fn init(&self, params: &InitParameters) -> Result<(), BoxError> {
        *self.params.lock().unwrap() = params.clone();
        Ok(())
    }

    fn handle(&self, _request: Request<Body>) -> BoxFuture<'static, Response> {
        self.trace.push("routing");
        Box::pin(async { "routed".into_response() })
    }

    fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Middleware that records its label before continuing the chain.
pub struct ProbeMiddleware {
    pub label: &'static str,
    pub trace: Trace,
}

impl Middleware for ProbeMiddleware {
    fn call(&self, request: Request<Body>, next: Next) -> BoxFuture<'static, Response> {
        self.trace.push(self.label);
        next.run(request)
    }
}

/// Middleware with no dependencies, for building by name.
#[derive(Default)]
pub struct Passthrough;

impl Middleware for Passthrough {
    fn call(&self, request: Request<Body>, next: Next) -> BoxFuture<'static, Response> {
        next.run(request)
    }
}

struct Recording {
    label: &'static str,
    trace: Trace,
    inner: SharedHandler,
}

impl Handler for Recording {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        self.trace.push(self.label);
        self.inner.handle(request)
    }
}

/// Session layer that only records that it saw the request.
pub struct ProbeSessionLayer {
    pub trace: Trace,
    pub manager: SessionManager,
}

impl ProbeSessionLayer {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            manager: SessionManager::default(),
        }
    }
}

impl SessionLayer for ProbeSessionLayer {
    fn manager(&self) -> &SessionManager {
        &self.manager
    }

    fn wrap(&self, inner: SharedHandler) -> SharedHandler {
        Arc::new(Recording {
            label: "session",
            trace: self.trace.clone(),
            inner,
        })
    }
}

/// Security layer that only records that it saw the request.
pub struct ProbeSecurityLayer {
    pub trace: Trace,
}

impl SecurityLayer for ProbeSecurityLayer {
    fn wrap(&self, inner: SharedHandler) -> SharedHandler {
        Arc::new(Recording {
            label: "security",
            trace: self.trace.clone(),
            inner,
        })
    }
}

/// Injector that tags every freshly built `Echo` and counts its calls.
#[derive(Default)]
pub struct Tagger {
    pub calls: AtomicUsize,
}

impl Tagger {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Injector for Tagger {
    fn inject_route(&self, mut route: Box<dyn Route>) -> Result<Box<dyn Route>, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(echo) = route.downcast_mut::<Echo>() {
            echo.injected = Some("injected".to_string());
        }
        Ok(route)
    }

    fn inject_middleware(
        &self,
        middleware: Box<dyn Middleware>,
    ) -> Result<Box<dyn Middleware>, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(middleware)
    }

    fn inject_listener(
        &self,
        listener: Box<dyn ContextListener>,
    ) -> Result<Box<dyn ContextListener>, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(listener)
    }
}

/// Listener that registers a route mapped to `/late/*` while the context starts.
#[derive(Default)]
pub struct LateRouteInstaller;

impl ContextListener for LateRouteInstaller {
    fn context_initialized(&self, context: &ContextFacade) -> Result<(), BoxError> {
        let late = context.add_route("late", RouteSource::instance(Labeled("late")))?;
        late.add_mapping(&["/late/*"])?;
        Ok(())
    }
}

/// Listener that records both lifecycle callbacks.
pub struct ProbeListener {
    pub label: &'static str,
    pub trace: Trace,
}

impl ContextListener for ProbeListener {
    fn context_initialized(&self, _context: &ContextFacade) -> Result<(), BoxError> {
        self.trace.push(format!("{}:initialized", self.label));
        Ok(())
    }

    fn context_destroyed(&self, _context: &ContextFacade) {
        self.trace.push(format!("{}:destroyed", self.label));
    }
}

/// Listener that rejects the start.
pub struct FailingListener;

impl ContextListener for FailingListener {
    fn context_initialized(&self, _context: &ContextFacade) -> Result<(), BoxError> {
        Err("listener refused to start".into())
    }
}
