//! Registration descriptors.

use std::sync::Arc;

use crate::artifact::{
    ContextListener, InitParameters, ListenerSource, Middleware, MiddlewareSource, Route,
    RouteSource,
};
use crate::routing::{DispatcherTypes, PathSpec};

/// A named route: its source, path mappings and init parameters.
#[derive(Debug, Clone)]
pub struct RouteHolder {
    name: String,
    source: RouteSource,
    pub(crate) mappings: Vec<PathSpec>,
    pub(crate) init_params: InitParameters,
    pub(crate) instance: Option<Arc<dyn Route>>,
}

impl RouteHolder {
    pub fn new(name: impl Into<String>, source: RouteSource) -> Self {
        Self {
            name: name.into(),
            source,
            mappings: Vec::new(),
            init_params: InitParameters::new(),
            instance: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &RouteSource {
        &self.source
    }

    pub fn mappings(&self) -> &[PathSpec] {
        &self.mappings
    }

    pub fn init_params(&self) -> &InitParameters {
        &self.init_params
    }

    /// The live instance, present between start and stop.
    pub fn instance(&self) -> Option<&Arc<dyn Route>> {
        self.instance.as_ref()
    }
}

/// What a middleware mapping selects on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingTarget {
    Path(PathSpec),
    /// A route name; `*` selects every route.
    Route(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareMapping {
    pub target: MappingTarget,
    pub dispatch: DispatcherTypes,
}

impl MiddlewareMapping {
    pub(crate) fn selects_path(&self, path: &str) -> bool {
        matches!(&self.target, MappingTarget::Path(spec) if spec.matches(path))
    }

    pub(crate) fn selects_route(&self, route: &str) -> bool {
        matches!(&self.target, MappingTarget::Route(name) if name == "*" || name == route)
    }
}

/// A named middleware: its source, mappings and init parameters.
#[derive(Debug, Clone)]
pub struct MiddlewareHolder {
    name: String,
    source: MiddlewareSource,
    pub(crate) mappings: Vec<MiddlewareMapping>,
    pub(crate) init_params: InitParameters,
    pub(crate) instance: Option<Arc<dyn Middleware>>,
}

impl MiddlewareHolder {
    pub fn new(name: impl Into<String>, source: MiddlewareSource) -> Self {
        Self {
            name: name.into(),
            source,
            mappings: Vec::new(),
            init_params: InitParameters::new(),
            instance: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &MiddlewareSource {
        &self.source
    }

    pub fn mappings(&self) -> &[MiddlewareMapping] {
        &self.mappings
    }

    pub fn init_params(&self) -> &InitParameters {
        &self.init_params
    }

    pub fn instance(&self) -> Option<&Arc<dyn Middleware>> {
        self.instance.as_ref()
    }
}

/// An anonymous listener registration.
#[derive(Debug, Clone)]
pub struct ListenerHolder {
    source: ListenerSource,
    pub(crate) instance: Option<Arc<dyn ContextListener>>,
}

impl ListenerHolder {
    pub fn new(source: ListenerSource) -> Self {
        Self {
            source,
            instance: None,
        }
    }

    pub fn source(&self) -> &ListenerSource {
        &self.source
    }

    pub fn instance(&self) -> Option<&Arc<dyn ContextListener>> {
        self.instance.as_ref()
    }
}

// Trait objects carry no Debug; print the type only.
macro_rules! opaque_debug {
    ($($t:ident),*) => {$(
        impl std::fmt::Debug for dyn $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(concat!("dyn ", stringify!($t)))
            }
        }
    )*};
}

opaque_debug!(Route, Middleware, ContextListener);
