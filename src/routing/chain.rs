//! Middleware chain execution.

use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;

use crate::artifact::{Middleware, Route};
use crate::handler::not_found;

/// The remainder of a middleware chain, ending at the target route.
///
/// Each middleware receives the `Next` positioned after itself and decides
/// whether to continue by calling [`Next::run`].
#[derive(Clone)]
pub struct Next {
    chain: Arc<[Arc<dyn Middleware>]>,
    position: usize,
    target: Option<Arc<dyn Route>>,
}

impl Next {
    pub(crate) fn new(chain: Vec<Arc<dyn Middleware>>, target: Option<Arc<dyn Route>>) -> Self {
        Self {
            chain: chain.into(),
            position: 0,
            target,
        }
    }

    /// Middleware left to run, including the next one.
    pub fn remaining(&self) -> usize {
        self.chain.len() - self.position
    }

    pub fn run(mut self, request: Request<Body>) -> BoxFuture<'static, Response> {
        match self.chain.get(self.position).cloned() {
            Some(middleware) => {
                self.position += 1;
                middleware.call(request, self)
            }
            None => match self.target {
                Some(route) => route.handle(request),
                None => Box::pin(async { not_found() }),
            },
        }
    }
}
