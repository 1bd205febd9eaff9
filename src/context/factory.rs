//! Layer factory.
//!
//! # Responsibilities
//! - Create the session, security and routing layers on first access
//! - Honor the enable flags fixed at construction
//! - Let the host substitute layers and the default security factory before start
//!
//! # Design Decisions
//! - Idempotent: an existing layer is always returned as is
//! - Nothing is created once the context is Running
//! - The security factory is a host callback and runs outside the context lock
//! - A security factory failure is a construction error, never skipped

use std::sync::Arc;

use crate::artifact::ArtifactKind;
use crate::context::{ContextState, LayerOptions, ProcessingContext};
use crate::error::{ConstructionError, ContextError};
use crate::routing::RoutingLayer;
use crate::security::{SecurityFactory, SecurityLayer};
use crate::session::{default_session_layer, SessionLayer};

impl ContextState {
    pub(crate) fn ensure_session(&mut self, context_path: &str) -> Option<Arc<dyn SessionLayer>> {
        if self.session.is_none()
            && self.options.contains(LayerOptions::SESSIONS)
            && !self.gate.is_running()
        {
            tracing::debug!("Creating default session layer");
            self.session = Some(default_session_layer(context_path, self.session_cookie.clone()));
        }
        self.session.clone()
    }

    /// The routing layer has no flag; it is created whenever it is missing.
    pub(crate) fn ensure_routing(&mut self) -> &mut RoutingLayer {
        self.routing.get_or_insert_with(|| {
            tracing::debug!("Creating routing layer");
            RoutingLayer::new()
        })
    }
}

impl ProcessingContext {
    /// The session layer, created if sessions are enabled and the context is
    /// not running. `None` when sessions are disabled.
    pub fn ensure_session_layer(&self) -> Option<Arc<dyn SessionLayer>> {
        self.inner.lock().ensure_session(&self.inner.context_path)
    }

    /// The security layer, created through the security factory if security
    /// is enabled and the context is not running.
    ///
    /// The factory runs without the context lock held.
    pub fn ensure_security_layer(&self) -> Result<Option<Arc<dyn SecurityLayer>>, ContextError> {
        let factory = {
            let state = self.inner.lock();
            if state.security.is_some()
                || !state.options.contains(LayerOptions::SECURITY)
                || state.gate.is_running()
            {
                return Ok(state.security.clone());
            }
            state.security_factory.clone()
        };

        tracing::debug!(type_name = %factory.type_name(), "Creating security layer");
        let layer: Arc<dyn SecurityLayer> =
            Arc::from(factory.build().map_err(|source| ConstructionError::Failed {
                kind: ArtifactKind::SecurityLayer,
                type_name: factory.type_name().to_string(),
                source,
            })?);

        // A layer set while the factory ran wins.
        let mut state = self.inner.lock();
        Ok(Some(state.security.get_or_insert(layer).clone()))
    }

    /// Create the routing layer unless the context is running.
    /// Returns whether a routing layer exists.
    pub fn ensure_routing_layer(&self) -> bool {
        let mut state = self.inner.lock();
        if !state.gate.is_running() {
            state.ensure_routing();
        }
        state.routing.is_some()
    }

    /// The current session layer, without creating one.
    pub fn session_layer(&self) -> Option<Arc<dyn SessionLayer>> {
        self.inner.lock().session.clone()
    }

    /// The current security layer, without creating one.
    pub fn security_layer(&self) -> Option<Arc<dyn SecurityLayer>> {
        self.inner.lock().security.clone()
    }

    pub fn has_routing_layer(&self) -> bool {
        self.inner.lock().routing.is_some()
    }

    /// Read access to the routing layer, if one exists.
    pub fn with_routing_layer<R>(&self, f: impl FnOnce(&RoutingLayer) -> R) -> Option<R> {
        self.inner.lock().routing.as_ref().map(f)
    }

    pub fn set_session_layer(&self, layer: Arc<dyn SessionLayer>) -> Result<(), ContextError> {
        let mut state = self.inner.lock();
        state.configure("set_session_layer")?;
        state.session = Some(layer);
        Ok(())
    }

    pub fn set_security_layer(&self, layer: Arc<dyn SecurityLayer>) -> Result<(), ContextError> {
        let mut state = self.inner.lock();
        state.configure("set_security_layer")?;
        state.security = Some(layer);
        Ok(())
    }

    /// Replace the routing layer, registrations included.
    pub fn set_routing_layer(&self, layer: RoutingLayer) -> Result<(), ContextError> {
        let mut state = self.inner.lock();
        state.configure("set_routing_layer")?;
        state.routing = Some(layer);
        Ok(())
    }

    /// Factory used when the security layer is created on demand.
    pub fn set_security_factory(&self, factory: SecurityFactory) -> Result<(), ContextError> {
        let mut state = self.inner.lock();
        state.configure("set_security_factory")?;
        state.security_factory = factory;
        Ok(())
    }

    pub fn set_options(&self, options: LayerOptions) -> Result<(), ContextError> {
        let mut state = self.inner.lock();
        state.configure("set_options")?;
        state.options = options;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Factory;
    use crate::security::ConstraintSecurityLayer;

    #[test]
    fn test_disabled_layers_are_never_created() {
        let context = ProcessingContext::new("", LayerOptions::empty());
        assert!(context.ensure_session_layer().is_none());
        assert!(context.ensure_security_layer().unwrap().is_none());
        assert!(context.ensure_routing_layer());
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let context = ProcessingContext::new("", LayerOptions::SESSIONS | LayerOptions::SECURITY);
        let a = context.ensure_session_layer().unwrap();
        let b = context.ensure_session_layer().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let a = context.ensure_security_layer().unwrap().unwrap();
        let b = context.ensure_security_layer().unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_security_factory_failure() {
        let context = ProcessingContext::new("", LayerOptions::SECURITY);
        context
            .set_security_factory(Factory::<dyn SecurityLayer>::new("Unbuildable", || {
                Err("missing realm".into())
            }))
            .unwrap();
        let err = context.ensure_security_layer().err().unwrap();
        assert!(err.is_construction());
        assert!(context.security_layer().is_none());
    }

    #[test]
    fn test_substituted_layer_is_kept() {
        let context = ProcessingContext::new("", LayerOptions::SECURITY);
        let layer: Arc<dyn SecurityLayer> = Arc::new(ConstraintSecurityLayer::new());
        context.set_security_layer(layer.clone()).unwrap();
        let ensured = context.ensure_security_layer().unwrap().unwrap();
        assert!(Arc::ptr_eq(&layer, &ensured));
    }
}
