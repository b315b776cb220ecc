//! The handler seam.
//!
//! A [`Handler`] turns a request into a response. The validation middleware
//! is itself a handler that wraps another one, so routers and servers only
//! ever deal with this single trait.
//!
//! # Example
//!
//! ```rust
//! use valmid::{handler_fn, Handler, Request, Response, ResponseExt};
//! use http::StatusCode;
//!
//! let hello = handler_fn(|_request: Request| async {
//!     Response::text(StatusCode::OK, "hello")
//! });
//!
//! # tokio_test::block_on(async {
//! let request = Request::new(Default::default());
//! assert_eq!(hello.call(request).await.status(), StatusCode::OK);
//! # });
//! ```

use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that answers a request.
pub trait Handler: Send + Sync + 'static {
    /// Handles the request.
    fn call(&self, request: Request) -> BoxFuture<'static, Response>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        (**self).call(request)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        (**self).call(request)
    }
}

/// A handler built from an async function.
#[derive(Clone)]
pub struct HandlerFn<F> {
    func: F,
}

impl<F> std::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        Box::pin((self.func)(request))
    }
}

/// Wraps an async function as a [`Handler`].
pub const fn handler_fn<F, Fut>(func: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    HandlerFn { func }
}
