//! Type registry: string type identifiers mapped to factories.
//!
//! # Design Decisions
//! - One namespace per artifact kind
//! - Populated by the host before start; a miss is a construction error

use std::collections::HashMap;

use crate::artifact::{ContextListener, Factory, Middleware, Route};

/// Factories the context can build by name.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    pub(crate) routes: HashMap<String, Factory<dyn Route>>,
    pub(crate) middleware: HashMap<String, Factory<dyn Middleware>>,
    pub(crate) listeners: HashMap<String, Factory<dyn ContextListener>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_route(&mut self, name: impl Into<String>, factory: Factory<dyn Route>) -> &mut Self {
        self.routes.insert(name.into(), factory);
        self
    }

    pub fn register_middleware(
        &mut self,
        name: impl Into<String>,
        factory: Factory<dyn Middleware>,
    ) -> &mut Self {
        self.middleware.insert(name.into(), factory);
        self
    }

    pub fn register_listener(
        &mut self,
        name: impl Into<String>,
        factory: Factory<dyn ContextListener>,
    ) -> &mut Self {
        self.listeners.insert(name.into(), factory);
        self
    }

    pub fn has_route(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn has_middleware(&self, name: &str) -> bool {
        self.middleware.contains_key(name)
    }

    pub fn has_listener(&self, name: &str) -> bool {
        self.listeners.contains_key(name)
    }

    /// Merge `other` into `self`; entries in `other` win.
    pub fn extend(&mut self, other: TypeRegistry) {
        self.routes.extend(other.routes);
        self.middleware.extend(other.middleware);
        self.listeners.extend(other.listeners);
    }
}
