//! Registration handles returned by `add_route` and `add_middleware`.
//!
//! A handle names a registration inside its context. Identity (name, source)
//! is fixed; mappings and init parameters may be extended until the context
//! is running.

use std::sync::Arc;

use crate::artifact::{ArtifactKind, InitParameters, SourceKind};
use crate::context::ContextInner;
use crate::error::ContextError;
use crate::registration::{MappingTarget, MiddlewareHolder, MiddlewareMapping, RouteHolder};
use crate::routing::{DispatcherTypes, PathSpec};

fn not_registered(kind: ArtifactKind, name: &str) -> ContextError {
    ContextError::NotRegistered {
        kind,
        name: name.to_string(),
    }
}

fn parse_all(patterns: &[&str]) -> Result<Vec<PathSpec>, ContextError> {
    patterns.iter().map(|p| PathSpec::parse(p)).collect()
}

/// Handle to a registered route.
#[derive(Clone)]
pub struct RouteRegistration {
    context: Arc<ContextInner>,
    name: String,
}

impl RouteRegistration {
    pub(crate) fn new(context: Arc<ContextInner>, name: String) -> Self {
        Self { context, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn read<R>(&self, f: impl FnOnce(&RouteHolder) -> R) -> Option<R> {
        let state = self.context.lock();
        state
            .routing
            .as_ref()
            .and_then(|routing| routing.ledger().route(&self.name))
            .map(f)
    }

    fn write<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut RouteHolder) -> R,
    ) -> Result<R, ContextError> {
        let mut state = self.context.lock();
        state.configure(operation)?;
        state
            .routing
            .as_mut()
            .and_then(|routing| routing.ledger_mut().route_mut(&self.name))
            .map(f)
            .ok_or_else(|| not_registered(ArtifactKind::Route, &self.name))
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        self.read(|holder| holder.source().kind())
    }

    pub fn type_name(&self) -> Option<String> {
        self.read(|holder| holder.source().type_name().map(str::to_string))
            .flatten()
    }

    /// Mapped URL patterns, in mapping order.
    pub fn mappings(&self) -> Vec<String> {
        self.read(|holder| holder.mappings().iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    /// Map more patterns to this route.
    ///
    /// Returns the patterns already mapped to another route; those are left
    /// alone. An invalid pattern fails the whole call before anything changes.
    pub fn add_mapping(&self, patterns: &[&str]) -> Result<Vec<String>, ContextError> {
        let specs = parse_all(patterns)?;
        let mut state = self.context.lock();
        state.configure("add_mapping")?;
        let routing = state
            .routing
            .as_mut()
            .ok_or_else(|| not_registered(ArtifactKind::Route, &self.name))?;
        routing.ledger_mut().add_route_mappings(&self.name, specs)
    }

    pub fn init_parameter(&self, key: &str) -> Option<String> {
        self.read(|holder| holder.init_params().get(key).cloned())
            .flatten()
    }

    pub fn init_parameters(&self) -> InitParameters {
        self.read(|holder| holder.init_params().clone())
            .unwrap_or_default()
    }

    /// Set an init parameter. Returns `false`, changing nothing, if the key
    /// already has a value.
    pub fn set_init_parameter(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<bool, ContextError> {
        let (key, value) = (key.into(), value.into());
        self.write("set_init_parameter", |holder| {
            insert_if_absent(&mut holder.init_params, key, value)
        })
    }

    /// Set several init parameters; keys already set are skipped and returned.
    pub fn set_init_parameters(&self, params: InitParameters) -> Result<Vec<String>, ContextError> {
        self.write("set_init_parameters", |holder| {
            params
                .into_iter()
                .filter_map(|(key, value)| {
                    (!insert_if_absent(&mut holder.init_params, key.clone(), value)).then_some(key)
                })
                .collect()
        })
    }
}

/// Handle to a registered middleware.
#[derive(Clone)]
pub struct MiddlewareRegistration {
    context: Arc<ContextInner>,
    name: String,
}

impl MiddlewareRegistration {
    pub(crate) fn new(context: Arc<ContextInner>, name: String) -> Self {
        Self { context, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn read<R>(&self, f: impl FnOnce(&MiddlewareHolder) -> R) -> Option<R> {
        let state = self.context.lock();
        state
            .routing
            .as_ref()
            .and_then(|routing| routing.ledger().middleware(&self.name))
            .map(f)
    }

    fn write<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut MiddlewareHolder) -> R,
    ) -> Result<R, ContextError> {
        let mut state = self.context.lock();
        state.configure(operation)?;
        state
            .routing
            .as_mut()
            .and_then(|routing| routing.ledger_mut().middleware_mut(&self.name))
            .map(f)
            .ok_or_else(|| not_registered(ArtifactKind::Middleware, &self.name))
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        self.read(|holder| holder.source().kind())
    }

    pub fn type_name(&self) -> Option<String> {
        self.read(|holder| holder.source().type_name().map(str::to_string))
            .flatten()
    }

    pub fn mappings(&self) -> Vec<MiddlewareMapping> {
        self.read(|holder| holder.mappings().to_vec())
            .unwrap_or_default()
    }

    /// Apply this middleware to requests whose path matches any of `patterns`.
    pub fn add_mapping_for_paths(
        &self,
        patterns: &[&str],
        dispatch: DispatcherTypes,
    ) -> Result<(), ContextError> {
        let specs = parse_all(patterns)?;
        self.write("add_mapping_for_paths", |holder| {
            holder.mappings.extend(specs.into_iter().map(|spec| MiddlewareMapping {
                target: MappingTarget::Path(spec),
                dispatch: dispatch.effective(),
            }));
        })
    }

    /// Apply this middleware to the named routes; `"*"` selects every route.
    pub fn add_mapping_for_route_names(
        &self,
        names: &[&str],
        dispatch: DispatcherTypes,
    ) -> Result<(), ContextError> {
        self.write("add_mapping_for_route_names", |holder| {
            holder.mappings.extend(names.iter().map(|name| MiddlewareMapping {
                target: MappingTarget::Route(name.to_string()),
                dispatch: dispatch.effective(),
            }));
        })
    }

    pub fn init_parameter(&self, key: &str) -> Option<String> {
        self.read(|holder| holder.init_params().get(key).cloned())
            .flatten()
    }

    pub fn init_parameters(&self) -> InitParameters {
        self.read(|holder| holder.init_params().clone())
            .unwrap_or_default()
    }

    pub fn set_init_parameter(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<bool, ContextError> {
        let (key, value) = (key.into(), value.into());
        self.write("set_init_parameter", |holder| {
            insert_if_absent(&mut holder.init_params, key, value)
        })
    }
}

fn insert_if_absent(params: &mut InitParameters, key: String, value: String) -> bool {
    if params.contains_key(&key) {
        return false;
    }
    params.insert(key, value);
    true
}


impl std::fmt::Debug for RouteRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRegistration")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for MiddlewareRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareRegistration")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
