//! Dispatch types and request extensions read by the routing layer.

use bitflags::bitflags;

/// How a request reached the routing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DispatchType {
    #[default]
    Request,
    Forward,
    Include,
    Error,
    Async,
}

impl DispatchType {
    pub fn flag(self) -> DispatcherTypes {
        match self {
            DispatchType::Request => DispatcherTypes::REQUEST,
            DispatchType::Forward => DispatcherTypes::FORWARD,
            DispatchType::Include => DispatcherTypes::INCLUDE,
            DispatchType::Error => DispatcherTypes::ERROR,
            DispatchType::Async => DispatcherTypes::ASYNC,
        }
    }
}

bitflags! {
    /// The dispatch types a middleware mapping applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DispatcherTypes: u8 {
        const REQUEST = 1 << 0;
        const FORWARD = 1 << 1;
        const INCLUDE = 1 << 2;
        const ERROR = 1 << 3;
        const ASYNC = 1 << 4;
    }
}

impl DispatcherTypes {
    /// An empty set means `REQUEST` only.
    pub fn effective(self) -> Self {
        if self.is_empty() {
            DispatcherTypes::REQUEST
        } else {
            self
        }
    }

    pub fn allows(self, dispatch: DispatchType) -> bool {
        self.effective().contains(dispatch.flag())
    }
}

/// The request path with the context path stripped, set by the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInContext(pub String);
