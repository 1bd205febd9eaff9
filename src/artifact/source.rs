//! Where an artifact comes from: a factory, a registered type name, or a ready instance.

use std::fmt;
use std::sync::Arc;

use crate::artifact::{ContextListener, Middleware, Route};
use crate::error::BoxError;

type MakeFn<T> = dyn Fn() -> Result<Box<T>, BoxError> + Send + Sync;

/// Default-constructs an artifact. Stands in for a class reference.
pub struct Factory<T: ?Sized> {
    type_name: Arc<str>,
    make: Arc<MakeFn<T>>,
}

impl<T: ?Sized> Factory<T> {
    pub fn new<F>(type_name: impl Into<String>, make: F) -> Self
    where
        F: Fn() -> Result<Box<T>, BoxError> + Send + Sync + 'static,
    {
        Self {
            type_name: Arc::from(type_name.into()),
            make: Arc::new(make),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub(crate) fn build(&self) -> Result<Box<T>, BoxError> {
        (self.make)()
    }
}

impl<T: ?Sized> Clone for Factory<T> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name.clone(),
            make: self.make.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory").field("type_name", &self.type_name).finish()
    }
}

/// Which of the three registration forms a source uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Class,
    Name,
    Instance,
}

/// The target artifact of a registration.
pub enum ArtifactSource<T: ?Sized> {
    /// Build with a factory; the result goes through the injection hook.
    Class(Factory<T>),
    /// Resolve through the context's type registry, then build and inject.
    Name(String),
    /// Use as is; never injected.
    Instance(Arc<T>),
}

pub type RouteSource = ArtifactSource<dyn Route>;
pub type MiddlewareSource = ArtifactSource<dyn Middleware>;
pub type ListenerSource = ArtifactSource<dyn ContextListener>;

impl<T: ?Sized> ArtifactSource<T> {
    pub fn class(factory: Factory<T>) -> Self {
        Self::Class(factory)
    }

    pub fn named(type_name: impl Into<String>) -> Self {
        Self::Name(type_name.into())
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Class(_) => SourceKind::Class,
            Self::Name(_) => SourceKind::Name,
            Self::Instance(_) => SourceKind::Instance,
        }
    }

    /// Type name when known without constructing anything.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Class(factory) => Some(factory.type_name()),
            Self::Name(name) => Some(name),
            Self::Instance(_) => None,
        }
    }
}

impl<T: ?Sized> Clone for ArtifactSource<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Class(factory) => Self::Class(factory.clone()),
            Self::Name(name) => Self::Name(name.clone()),
            Self::Instance(instance) => Self::Instance(instance.clone()),
        }
    }
}

impl<T: ?Sized> fmt::Debug for ArtifactSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(factory) => f.debug_tuple("Class").field(&factory.type_name()).finish(),
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

// Per-kind constructors. Generic code cannot coerce `Box<R>` into `Box<T>`
// for an unsized `T`, so each kind spells out its own.
macro_rules! kind_constructors {
    ($($t:ident),*) => {$(
        impl Factory<dyn $t> {
            /// Factory that default-constructs `R`.
            pub fn of<R: $t + Default>() -> Self {
                Self::new(std::any::type_name::<R>(), || Ok(Box::new(R::default()) as Box<dyn $t>))
            }
        }

        impl ArtifactSource<dyn $t> {
            /// Class source that default-constructs `R`.
            pub fn of<R: $t + Default>() -> Self {
                Self::Class(Factory::<dyn $t>::of::<R>())
            }

            /// Wrap an already-built instance.
            pub fn instance<R: $t>(instance: R) -> Self {
                Self::Instance(Arc::new(instance))
            }
        }
    )*};
}

kind_constructors!(Route, Middleware, ContextListener);
