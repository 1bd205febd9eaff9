//! Request handler abstraction shared by every layer of the chain.
//!
//! # Design Decisions
//! - Handlers return `'static` futures; implementations clone what they need
//!   out of `&self`
//! - Handlers are infallible; failures are expressed as HTTP responses

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;

/// One stage of the request-processing chain.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response>;
}

/// A handler shared between the chain and the layers that wrap it.
pub type SharedHandler = Arc<dyn Handler>;

/// Adapts an async closure into a [`Handler`].
pub struct HandlerFn<F> {
    f: F,
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        Box::pin((self.f)(request))
    }
}

/// Wrap a closure as a [`SharedHandler`].
pub fn handler_fn<F, Fut>(f: F) -> SharedHandler
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(HandlerFn { f })
}

pub(crate) fn status_response(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}

pub(crate) fn not_found() -> Response {
    status_response(StatusCode::NOT_FOUND, "No matching route found")
}

pub(crate) fn unavailable() -> Response {
    status_response(StatusCode::SERVICE_UNAVAILABLE, "Context not running")
}
