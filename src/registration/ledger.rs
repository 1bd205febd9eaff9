//! Registration ledger: the named sets of routes, middleware and listeners.
//!
//! # Responsibilities
//! - Enforce name uniqueness per kind
//! - Preserve insertion order
//! - Hand out snapshots rather than live views
//!
//! # Design Decisions
//! - Single-writer: the owning context serializes mutation
//! - Check before insert, so a rejected add changes nothing

use std::collections::HashMap;

use crate::artifact::ArtifactKind;
use crate::error::ContextError;
use crate::registration::holder::{ListenerHolder, MiddlewareHolder, RouteHolder};
use crate::routing::PathSpec;

/// Registrations addressable by a unique name.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for RouteHolder {
    fn name(&self) -> &str {
        RouteHolder::name(self)
    }
}

impl Named for MiddlewareHolder {
    fn name(&self) -> &str {
        MiddlewareHolder::name(self)
    }
}

/// Insertion-ordered store with a name index.
#[derive(Debug, Clone)]
pub struct NamedLedger<H> {
    kind: ArtifactKind,
    entries: Vec<H>,
    index: HashMap<String, usize>,
}

impl<H: Named> NamedLedger<H> {
    pub fn new(kind: ArtifactKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a holder, failing with `DuplicateName` if the name is taken.
    pub fn insert(&mut self, holder: H) -> Result<(), ContextError> {
        if self.index.contains_key(holder.name()) {
            return Err(ContextError::DuplicateName {
                kind: self.kind,
                name: holder.name().to_string(),
            });
        }
        self.index.insert(holder.name().to_string(), self.entries.len());
        self.entries.push(holder);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&H> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut H> {
        self.index.get(name).map(|&i| &mut self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &H> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut H> {
        self.entries.iter_mut()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|h| h.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H: Named + Clone> NamedLedger<H> {
    /// Insertion-ordered copy of every holder.
    pub fn snapshot(&self) -> Vec<H> {
        self.entries.clone()
    }
}

/// Every registration a routing layer carries.
#[derive(Debug, Clone)]
pub struct RegistrationLedger {
    routes: NamedLedger<RouteHolder>,
    middleware: NamedLedger<MiddlewareHolder>,
    listeners: Vec<ListenerHolder>,
}

impl Default for RegistrationLedger {
    fn default() -> Self {
        Self {
            routes: NamedLedger::new(ArtifactKind::Route),
            middleware: NamedLedger::new(ArtifactKind::Middleware),
            listeners: Vec::new(),
        }
    }
}

impl RegistrationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&mut self, holder: RouteHolder) -> Result<(), ContextError> {
        self.routes.insert(holder)
    }

    pub fn add_middleware(&mut self, holder: MiddlewareHolder) -> Result<(), ContextError> {
        self.middleware.insert(holder)
    }

    /// Listeners are anonymous and never collide.
    pub fn add_listener(&mut self, holder: ListenerHolder) {
        self.listeners.push(holder);
    }

    pub fn route(&self, name: &str) -> Option<&RouteHolder> {
        self.routes.get(name)
    }

    pub fn middleware(&self, name: &str) -> Option<&MiddlewareHolder> {
        self.middleware.get(name)
    }

    pub(crate) fn route_mut(&mut self, name: &str) -> Option<&mut RouteHolder> {
        self.routes.get_mut(name)
    }

    pub(crate) fn middleware_mut(&mut self, name: &str) -> Option<&mut MiddlewareHolder> {
        self.middleware.get_mut(name)
    }

    pub fn list_routes(&self) -> Vec<RouteHolder> {
        self.routes.snapshot()
    }

    pub fn list_middleware(&self) -> Vec<MiddlewareHolder> {
        self.middleware.snapshot()
    }

    pub fn route_names(&self) -> Vec<String> {
        self.routes.names()
    }

    pub fn middleware_names(&self) -> Vec<String> {
        self.middleware.names()
    }

    pub fn listeners(&self) -> &[ListenerHolder] {
        &self.listeners
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn routes(&self) -> &NamedLedger<RouteHolder> {
        &self.routes
    }

    pub(crate) fn routes_mut(&mut self) -> &mut NamedLedger<RouteHolder> {
        &mut self.routes
    }

    pub(crate) fn middleware_ledger(&self) -> &NamedLedger<MiddlewareHolder> {
        &self.middleware
    }

    pub(crate) fn middleware_ledger_mut(&mut self) -> &mut NamedLedger<MiddlewareHolder> {
        &mut self.middleware
    }

    pub(crate) fn listeners_mut(&mut self) -> &mut Vec<ListenerHolder> {
        &mut self.listeners
    }

    /// Map `specs` to the route `name`.
    ///
    /// Returns the patterns already mapped to a different route; those are
    /// not added. Patterns already mapped to `name` are ignored.
    pub fn add_route_mappings(
        &mut self,
        name: &str,
        specs: Vec<PathSpec>,
    ) -> Result<Vec<String>, ContextError> {
        if !self.routes.contains(name) {
            return Err(ContextError::NotRegistered {
                kind: ArtifactKind::Route,
                name: name.to_string(),
            });
        }

        let mut conflicts = Vec::new();
        let mut accepted = Vec::new();
        for spec in specs {
            let owner = self
                .routes
                .iter()
                .find(|holder| holder.mappings.contains(&spec))
                .map(|holder| holder.name().to_string());
            match owner {
                Some(owner) if owner != name => conflicts.push(spec.to_string()),
                Some(_) => {}
                None if accepted.contains(&spec) => {}
                None => accepted.push(spec),
            }
        }

        if let Some(holder) = self.routes.get_mut(name) {
            holder.mappings.extend(accepted);
        }
        Ok(conflicts)
    }
}
