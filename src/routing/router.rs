//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Own the route and middleware registrations of a context
//! - Materialize their instances at start and compile them into a table
//! - Look up the matching route and middleware chain for a request
//!
//! # Design Decisions
//! - The compiled table is immutable and published through `ArcSwapOption`,
//!   so request tasks read it without locking
//! - Explicit 404 rather than a silent default
//! - Instances built by the container are dropped at stop and rebuilt at the
//!   next start; caller-supplied instances are reused

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;

use crate::artifact::inject::{resolve, Resolved};
use crate::artifact::{ArtifactKind, InitParameters, Injector, Middleware, Route, TypeRegistry};
use crate::error::ContextError;
use crate::handler::{unavailable, Handler, SharedHandler};
use crate::registration::{MiddlewareMapping, RegistrationLedger};
use crate::routing::chain::Next;
use crate::routing::dispatch::{DispatchType, PathInContext};
use crate::routing::matcher::PathMap;

/// A route ready for dispatch.
#[derive(Clone)]
pub struct CompiledRoute {
    pub name: String,
    pub route: Arc<dyn Route>,
}

#[derive(Clone)]
struct CompiledMiddleware {
    instance: Arc<dyn Middleware>,
    mappings: Vec<MiddlewareMapping>,
}

/// Immutable dispatch tables compiled from the ledger at start.
#[derive(Default)]
pub struct DispatchTable {
    paths: PathMap<usize>,
    routes: Vec<CompiledRoute>,
    by_name: HashMap<String, usize>,
    middleware: Vec<CompiledMiddleware>,
}

impl DispatchTable {
    /// The route whose mapping most specifically matches `path`.
    pub fn resolve(&self, path: &str) -> Option<&CompiledRoute> {
        self.paths.lookup(path).map(|&i| &self.routes[i])
    }

    pub fn route(&self, name: &str) -> Option<&CompiledRoute> {
        self.by_name.get(name).map(|&i| &self.routes[i])
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Middleware for a dispatch: path mappings first, then route-name
    /// mappings, each in registration order and filtered by dispatch type.
    pub fn chain_for(
        &self,
        path: Option<&str>,
        route: Option<&str>,
        dispatch: DispatchType,
    ) -> Vec<Arc<dyn Middleware>> {
        let mut selected: Vec<usize> = Vec::new();

        if let Some(path) = path {
            for (i, m) in self.middleware.iter().enumerate() {
                if m.mappings
                    .iter()
                    .any(|mapping| mapping.dispatch.allows(dispatch) && mapping.selects_path(path))
                {
                    selected.push(i);
                }
            }
        }

        if let Some(route) = route {
            for (i, m) in self.middleware.iter().enumerate() {
                if selected.contains(&i) {
                    continue;
                }
                if m.mappings
                    .iter()
                    .any(|mapping| mapping.dispatch.allows(dispatch) && mapping.selects_route(route))
                {
                    selected.push(i);
                }
            }
        }

        selected
            .into_iter()
            .map(|i| self.middleware[i].instance.clone())
            .collect()
    }

    /// Run the request through the matching middleware chain and route.
    pub fn dispatch(
        &self,
        request: Request<Body>,
        path: &str,
        dispatch: DispatchType,
    ) -> BoxFuture<'static, Response> {
        let target = self.resolve(path);
        match target {
            Some(route) => tracing::debug!(path = %path, route = %route.name, "Route matched"),
            None => tracing::debug!(path = %path, "No route matched"),
        }
        let chain = self.chain_for(Some(path), target.map(|r| r.name.as_str()), dispatch);
        Next::new(chain, target.map(|r| r.route.clone())).run(request)
    }

    /// Drive the named route directly, with only its route-name middleware.
    pub fn dispatch_named(
        &self,
        name: &str,
        request: Request<Body>,
        dispatch: DispatchType,
    ) -> Option<BoxFuture<'static, Response>> {
        let route = self.route(name)?;
        let chain = self.chain_for(None, Some(name), dispatch);
        Some(Next::new(chain, Some(route.route.clone())).run(request))
    }
}

/// The innermost handler: reads the live table on every request.
struct RoutingHandler {
    table: Arc<ArcSwapOption<DispatchTable>>,
}

impl Handler for RoutingHandler {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        let Some(table) = self.table.load_full() else {
            return Box::pin(async { unavailable() });
        };
        let path = request
            .extensions()
            .get::<PathInContext>()
            .map(|p| p.0.clone())
            .unwrap_or_else(|| request.uri().path().to_string());
        let dispatch = request
            .extensions()
            .get::<DispatchType>()
            .copied()
            .unwrap_or_default();
        table.dispatch(request, &path, dispatch)
    }
}

/// An artifact that still needs an instance before the table can compile.
pub(crate) enum Pending {
    Route {
        name: String,
        resolved: Resolved<dyn Route>,
        params: InitParameters,
    },
    Middleware {
        name: String,
        resolved: Resolved<dyn Middleware>,
        params: InitParameters,
    },
}

pub(crate) enum Built {
    Route(String, Arc<dyn Route>),
    Middleware(String, Arc<dyn Middleware>),
}

impl Pending {
    /// Build, inject and init. Runs without the context lock held.
    pub(crate) fn build(self, injector: Option<&dyn Injector>) -> Result<Built, ContextError> {
        match self {
            Pending::Route { name, resolved, params } => {
                let route = resolved.finish(injector)?;
                route.init(&params).map_err(|source| ContextError::Startup {
                    kind: ArtifactKind::Route,
                    source,
                })?;
                Ok(Built::Route(name, route))
            }
            Pending::Middleware { name, resolved, params } => {
                let middleware = resolved.finish(injector)?;
                middleware.init(&params).map_err(|source| ContextError::Startup {
                    kind: ArtifactKind::Middleware,
                    source,
                })?;
                Ok(Built::Middleware(name, middleware))
            }
        }
    }
}

/// The routing layer: registrations plus their compiled dispatch table.
#[derive(Default)]
pub struct RoutingLayer {
    ledger: RegistrationLedger,
    table: Arc<ArcSwapOption<DispatchTable>>,
}

impl RoutingLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &RegistrationLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut RegistrationLedger {
        &mut self.ledger
    }

    /// The handler at the core of the composed chain.
    pub(crate) fn handler(&self) -> SharedHandler {
        Arc::new(RoutingHandler {
            table: self.table.clone(),
        })
    }

    /// Shared slot the table is published into.
    pub(crate) fn table_slot(&self) -> Arc<ArcSwapOption<DispatchTable>> {
        self.table.clone()
    }

    /// The live table, present between start and stop.
    pub fn dispatch_table(&self) -> Option<Arc<DispatchTable>> {
        self.table.load_full()
    }

    pub fn is_initialized(&self) -> bool {
        self.table.load().is_some()
    }

    /// Registrations without an instance, resolved against `registry`.
    pub(crate) fn pending(&self, registry: &TypeRegistry) -> Result<Vec<Pending>, ContextError> {
        let mut pending = Vec::new();
        for holder in self.ledger.routes().iter().filter(|h| h.instance.is_none()) {
            pending.push(Pending::Route {
                name: holder.name().to_string(),
                resolved: resolve(holder.source(), registry)?,
                params: holder.init_params.clone(),
            });
        }
        for holder in self.ledger.middleware_ledger().iter().filter(|h| h.instance.is_none()) {
            pending.push(Pending::Middleware {
                name: holder.name().to_string(),
                resolved: resolve(holder.source(), registry)?,
                params: holder.init_params.clone(),
            });
        }
        Ok(pending)
    }

    pub(crate) fn install(&mut self, built: Vec<Built>) {
        for artifact in built {
            match artifact {
                Built::Route(name, route) => {
                    if let Some(holder) = self.ledger.route_mut(&name) {
                        holder.instance = Some(route);
                    }
                }
                Built::Middleware(name, middleware) => {
                    if let Some(holder) = self.ledger.middleware_mut(&name) {
                        holder.instance = Some(middleware);
                    }
                }
            }
        }
    }

    /// Compile the ledger into a dispatch table and publish it.
    pub fn initialize(&self) {
        let mut table = DispatchTable::default();

        for holder in self.ledger.routes().iter() {
            let Some(route) = holder.instance.clone() else {
                tracing::warn!(route = %holder.name(), "Route has no instance, skipping");
                continue;
            };
            let index = table.routes.len();
            for spec in &holder.mappings {
                table.paths.insert(spec, index);
            }
            table.by_name.insert(holder.name().to_string(), index);
            table.routes.push(CompiledRoute {
                name: holder.name().to_string(),
                route,
            });
        }

        for holder in self.ledger.middleware_ledger().iter() {
            let Some(instance) = holder.instance.clone() else {
                tracing::warn!(middleware = %holder.name(), "Middleware has no instance, skipping");
                continue;
            };
            table.middleware.push(CompiledMiddleware {
                instance,
                mappings: holder.mappings.clone(),
            });
        }

        tracing::info!(
            routes = table.routes.len(),
            middleware = table.middleware.len(),
            "Dispatch tables compiled"
        );
        self.table.store(Some(Arc::new(table)));
    }

    /// Unpublish the table and take every instance out of the ledger.
    /// The caller destroys them once the context lock is released.
    pub(crate) fn shutdown(&mut self) -> Retired {
        self.table.store(None);
        Retired {
            middleware: self
                .ledger
                .middleware_ledger_mut()
                .iter_mut()
                .filter_map(|holder| holder.instance.take())
                .collect(),
            routes: self
                .ledger
                .routes_mut()
                .iter_mut()
                .filter_map(|holder| holder.instance.take())
                .collect(),
        }
    }
}

/// Instances taken out of a routing layer at shutdown, awaiting `destroy`.
#[must_use]
pub(crate) struct Retired {
    middleware: Vec<Arc<dyn Middleware>>,
    routes: Vec<Arc<dyn Route>>,
}

impl Retired {
    pub(crate) fn none() -> Self {
        Self {
            middleware: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Middleware first, then routes.
    pub(crate) fn destroy(self) {
        for middleware in self.middleware {
            middleware.destroy();
        }
        for route in self.routes {
            route.destroy();
        }
    }
}
