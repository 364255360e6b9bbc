//! Stream pipeline behaviors.
//!
//! A stream behavior receives the remainder of the stream pipeline as a
//! [`StreamNext`] and returns the stream the caller will see, typically by
//! running `next` and adapting its items.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::Result;
use crate::handler::{BoxStream, RequestContext, StreamRequestHandler};
use crate::message::StreamRequest;

/// Middleware around the production of one stream request type.
pub trait StreamPipelineBehavior<S: StreamRequest>: Send + Sync + 'static {
    /// Produce the stream, delegating to `next` to continue the pipeline.
    fn handle(&self, next: StreamNext<S>) -> BoxStream<'static, Result<S::Item>>;
}

/// The remainder of a stream pipeline. Owns the request until it reaches the handler.
pub struct StreamNext<S: StreamRequest> {
    request: S,
    ctx: RequestContext,
    behaviors: VecDeque<Arc<dyn StreamPipelineBehavior<S>>>,
    handler: Arc<dyn StreamRequestHandler<S>>,
}

impl<S: StreamRequest> StreamNext<S> {
    /// Build a pipeline; `behaviors[0]` runs outermost.
    pub fn new(
        request: S,
        ctx: RequestContext,
        behaviors: Vec<Arc<dyn StreamPipelineBehavior<S>>>,
        handler: Arc<dyn StreamRequestHandler<S>>,
    ) -> Self {
        Self {
            request,
            ctx,
            behaviors: behaviors.into(),
            handler,
        }
    }

    /// The request being streamed.
    pub fn request(&self) -> &S {
        &self.request
    }

    /// Mutable access to the request, for behaviors that rewrite it.
    pub fn request_mut(&mut self) -> &mut S {
        &mut self.request
    }

    /// Context of the call.
    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    /// Run the next behavior, or the handler once none remain.
    pub fn run(mut self) -> BoxStream<'static, Result<S::Item>> {
        match self.behaviors.pop_front() {
            Some(behavior) => behavior.handle(self),
            None => self.handler.handle(self.request, self.ctx),
        }
    }
}
