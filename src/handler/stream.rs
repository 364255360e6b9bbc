//! Stream request handlers.

use std::marker::PhantomData;

use futures::Stream;

use super::RequestContext;
use crate::error::Result;
use crate::message::StreamRequest;

/// Boxed lazy sequence produced by stream handlers.
pub type BoxStream<'a, T> = futures::stream::BoxStream<'a, T>;

/// Handles one stream request type by producing a lazy sequence of items.
///
/// Items must only be produced as the returned stream is polled. The context's
/// cancellation token fires when the consumer cancels.
pub trait StreamRequestHandler<S: StreamRequest>: Send + Sync + 'static {
    /// Start producing items for a request.
    fn handle(&self, request: S, ctx: RequestContext) -> BoxStream<'static, Result<S::Item>>;
}

/// Closure adapter for [`StreamRequestHandler`].
pub struct FnStreamHandler<F, S, St>
where
    F: Fn(S, RequestContext) -> St + Send + Sync + 'static,
    S: StreamRequest,
    St: Stream<Item = Result<S::Item>> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(S) -> St>,
}

impl<F, S, St> StreamRequestHandler<S> for FnStreamHandler<F, S, St>
where
    F: Fn(S, RequestContext) -> St + Send + Sync + 'static,
    S: StreamRequest,
    St: Stream<Item = Result<S::Item>> + Send + 'static,
{
    fn handle(&self, request: S, ctx: RequestContext) -> BoxStream<'static, Result<S::Item>> {
        Box::pin((self.handler)(request, ctx))
    }
}

/// Build a stream handler from a closure returning a stream.
pub fn stream_handler_fn<S, F, St>(handler: F) -> FnStreamHandler<F, S, St>
where
    F: Fn(S, RequestContext) -> St + Send + Sync + 'static,
    S: StreamRequest,
    St: Stream<Item = Result<S::Item>> + Send + 'static,
{
    FnStreamHandler {
        handler,
        _phantom: PhantomData,
    }
}
