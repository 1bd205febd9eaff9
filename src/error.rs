//! Error taxonomy for context configuration and composition.
//!
//! # Design Decisions
//! - Every error surfaces synchronously to the caller of the mutating operation
//! - Nothing is retried or swallowed internally
//! - Low-level construction failures are always wrapped in [`ConstructionError`]

use thiserror::Error;

use crate::artifact::ArtifactKind;
use crate::lifecycle::LifecycleState;

/// Boxed error type accepted from host-supplied factories, injectors and listeners.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the processing context and its registration surface.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Operation attempted outside its permitted lifecycle window.
    #[error("{operation} not permitted while context is {state}")]
    IllegalState {
        operation: &'static str,
        state: LifecycleState,
    },

    /// A registration with the same name already exists for this kind.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: ArtifactKind, name: String },

    /// Instantiation or injection of an artifact failed.
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// A registration handle outlived its registration (the routing layer was replaced).
    #[error("no {kind} registered as {name:?}")]
    NotRegistered { kind: ArtifactKind, name: String },

    /// A path mapping does not follow URL-pattern syntax.
    #[error("invalid path spec: {0:?}")]
    InvalidPathSpec(String),

    /// A listener or an artifact's `init` rejected the start.
    #[error("{kind} failed during startup: {source}")]
    Startup {
        kind: ArtifactKind,
        #[source]
        source: BoxError,
    },
}

impl ContextError {
    pub(crate) fn illegal_state(operation: &'static str, state: LifecycleState) -> Self {
        Self::IllegalState { operation, state }
    }

    /// True if this is an [`ContextError::IllegalState`].
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::IllegalState { .. })
    }

    /// True if this is a [`ContextError::DuplicateName`].
    pub fn is_duplicate_name(&self) -> bool {
        matches!(self, Self::DuplicateName { .. })
    }

    /// True if this is a [`ContextError::Construction`].
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::Construction(_))
    }
}

/// Framework-level construction failure for a route, middleware, listener or layer.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// No factory is registered under the requested type identifier.
    #[error("no {kind} type registered as {name:?}")]
    UnknownType { kind: ArtifactKind, name: String },

    /// The factory could not build an instance.
    #[error("failed to construct {kind} {type_name}: {source}")]
    Failed {
        kind: ArtifactKind,
        type_name: String,
        #[source]
        source: BoxError,
    },

    /// The injection hook rejected a freshly built instance.
    #[error("injection failed for {kind} {type_name}: {source}")]
    Injection {
        kind: ArtifactKind,
        type_name: String,
        #[source]
        source: BoxError,
    },
}

impl ConstructionError {
    /// The artifact kind that failed to construct.
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::UnknownType { kind, .. }
            | Self::Failed { kind, .. }
            | Self::Injection { kind, .. } => *kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_target() {
        let err = ContextError::illegal_state("add_route", LifecycleState::Running);
        assert_eq!(err.to_string(), "add_route not permitted while context is running");
        assert!(err.is_illegal_state());

        let err = ContextError::from(ConstructionError::UnknownType {
            kind: ArtifactKind::Route,
            name: "missing".into(),
        });
        assert!(err.is_construction());
        assert_eq!(err.to_string(), "no route type registered as \"missing\"");
    }
}
