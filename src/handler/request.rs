//! Request handlers.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use super::RequestContext;
use crate::error::Result;
use crate::message::Request;

/// Boxed future returned by handlers, behaviors and processors.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handles one request type and produces its response.
pub trait RequestHandler<R: Request>: Send + Sync + 'static {
    /// Handle a request.
    fn handle<'a>(&'a self, request: &'a R, ctx: RequestContext)
        -> BoxFuture<'a, Result<R::Response>>;
}

/// Wrapper that turns a closure over an owned request into a [`RequestHandler`].
///
/// The request is cloned before the closure is called so the returned future
/// does not borrow from the caller.
pub struct FnHandler<F, R, Fut>
where
    F: Fn(R, RequestContext) -> Fut + Send + Sync + 'static,
    R: Request + Clone,
    Fut: Future<Output = Result<R::Response>> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(R) -> Fut>,
}

impl<F, R, Fut> FnHandler<F, R, Fut>
where
    F: Fn(R, RequestContext) -> Fut + Send + Sync + 'static,
    R: Request + Clone,
    Fut: Future<Output = Result<R::Response>> + Send + 'static,
{
    /// Create a new closure handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, R, Fut> RequestHandler<R> for FnHandler<F, R, Fut>
where
    F: Fn(R, RequestContext) -> Fut + Send + Sync + 'static,
    R: Request + Clone,
    Fut: Future<Output = Result<R::Response>> + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        request: &'a R,
        ctx: RequestContext,
    ) -> BoxFuture<'a, Result<R::Response>> {
        Box::pin((self.handler)(request.clone(), ctx))
    }
}

/// Build a request handler from a closure.
///
/// ```
/// use mediator::{handler_fn, Request};
///
/// #[derive(Clone)]
/// struct Ping(u32);
/// impl Request for Ping {
///     type Response = u32;
/// }
///
/// let handler = handler_fn(|ping: Ping, _ctx| async move { Ok(ping.0 + 1) });
/// # let _ = handler;
/// ```
pub fn handler_fn<R, F, Fut>(handler: F) -> FnHandler<F, R, Fut>
where
    F: Fn(R, RequestContext) -> Fut + Send + Sync + 'static,
    R: Request + Clone,
    Fut: Future<Output = Result<R::Response>> + Send + 'static,
{
    FnHandler::new(handler)
}
