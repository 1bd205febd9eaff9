//! Injection hook and the single construction path shared by all artifact kinds.

use std::sync::Arc;

use crate::artifact::{
    ArtifactKind, ArtifactSource, ContextListener, Factory, Middleware, Route, TypeRegistry,
};
use crate::error::{BoxError, ConstructionError};

/// Host hook that populates dependencies of freshly constructed artifacts.
///
/// Each method may return the same instance (identity) or a replacement.
/// Caller-supplied instances never reach the hook.
pub trait Injector: Send + Sync {
    fn inject_route(&self, route: Box<dyn Route>) -> Result<Box<dyn Route>, BoxError> {
        Ok(route)
    }

    fn inject_middleware(
        &self,
        middleware: Box<dyn Middleware>,
    ) -> Result<Box<dyn Middleware>, BoxError> {
        Ok(middleware)
    }

    fn inject_listener(
        &self,
        listener: Box<dyn ContextListener>,
    ) -> Result<Box<dyn ContextListener>, BoxError> {
        Ok(listener)
    }
}

/// Glue between an artifact trait object and the registry / injector slot for it.
pub(crate) trait Artifact: Send + Sync + 'static {
    const KIND: ArtifactKind;

    fn registered(registry: &TypeRegistry, name: &str) -> Option<Factory<Self>>;

    fn inject(injector: &dyn Injector, instance: Box<Self>) -> Result<Box<Self>, BoxError>;
}

impl Artifact for dyn Route {
    const KIND: ArtifactKind = ArtifactKind::Route;

    fn registered(registry: &TypeRegistry, name: &str) -> Option<Factory<Self>> {
        registry.routes.get(name).cloned()
    }

    fn inject(injector: &dyn Injector, instance: Box<Self>) -> Result<Box<Self>, BoxError> {
        injector.inject_route(instance)
    }
}

impl Artifact for dyn Middleware {
    const KIND: ArtifactKind = ArtifactKind::Middleware;

    fn registered(registry: &TypeRegistry, name: &str) -> Option<Factory<Self>> {
        registry.middleware.get(name).cloned()
    }

    fn inject(injector: &dyn Injector, instance: Box<Self>) -> Result<Box<Self>, BoxError> {
        injector.inject_middleware(instance)
    }
}

impl Artifact for dyn ContextListener {
    const KIND: ArtifactKind = ArtifactKind::Listener;

    fn registered(registry: &TypeRegistry, name: &str) -> Option<Factory<Self>> {
        registry.listeners.get(name).cloned()
    }

    fn inject(injector: &dyn Injector, instance: Box<Self>) -> Result<Box<Self>, BoxError> {
        injector.inject_listener(instance)
    }
}

/// A source with its type name resolved, ready to build outside any lock.
pub(crate) enum Resolved<T: ?Sized> {
    Build(Factory<T>),
    Ready(Arc<T>),
}

/// Resolve a source against the registry. Cheap; builds nothing.
pub(crate) fn resolve<T: Artifact + ?Sized>(
    source: &ArtifactSource<T>,
    registry: &TypeRegistry,
) -> Result<Resolved<T>, ConstructionError> {
    match source {
        ArtifactSource::Class(factory) => Ok(Resolved::Build(factory.clone())),
        ArtifactSource::Name(name) => T::registered(registry, name)
            .map(Resolved::Build)
            .ok_or_else(|| ConstructionError::UnknownType {
                kind: T::KIND,
                name: name.clone(),
            }),
        ArtifactSource::Instance(instance) => Ok(Resolved::Ready(instance.clone())),
    }
}

impl<T: Artifact + ?Sized> Resolved<T> {
    /// Build (and inject) if needed.
    pub(crate) fn finish(self, injector: Option<&dyn Injector>) -> Result<Arc<T>, ConstructionError> {
        match self {
            Resolved::Build(factory) => construct(&factory, injector).map(Arc::from),
            Resolved::Ready(instance) => Ok(instance),
        }
    }
}

/// Default-construct through `factory`, then pass the result through the hook.
pub(crate) fn construct<T: Artifact + ?Sized>(
    factory: &Factory<T>,
    injector: Option<&dyn Injector>,
) -> Result<Box<T>, ConstructionError> {
    let instance = factory.build().map_err(|source| ConstructionError::Failed {
        kind: T::KIND,
        type_name: factory.type_name().to_string(),
        source,
    })?;

    match injector {
        Some(injector) => T::inject(injector, instance).map_err(|source| {
            ConstructionError::Injection {
                kind: T::KIND,
                type_name: factory.type_name().to_string(),
                source,
            }
        }),
        None => Ok(instance),
    }
}
