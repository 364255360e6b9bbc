//! Stream dispatch wrapper.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;

use crate::error::{MediatorError, Result};
use crate::handler::resolver::{resolve_many_as, resolve_one_as};
use crate::handler::{
    BoxStream, HandlerResolver, RequestContext, ServiceKey, ServiceKind, StreamRequestHandler,
};
use crate::message::StreamRequest;
use crate::pipeline::{StreamNext, StreamPipelineBehavior};

/// Type-erased view of a [`StreamWrapper`].
pub trait StreamWrapperBase: Send + Sync + 'static {
    /// Name of the stream request type.
    fn message_type(&self) -> &'static str;

    /// Access to the concrete wrapper for typed dispatch.
    fn as_any(&self) -> &dyn Any;
}

/// Dispatch plan for stream request type `S`.
pub struct StreamWrapper<S: StreamRequest> {
    handler: ServiceKey,
    behaviors: ServiceKey,
    _phantom: PhantomData<fn(S)>,
}

impl<S: StreamRequest> StreamWrapper<S> {
    /// Build the plan.
    pub fn new() -> Self {
        Self {
            handler: ServiceKey::of::<S>(ServiceKind::StreamHandler),
            behaviors: ServiceKey::of::<S>(ServiceKind::StreamBehavior),
            _phantom: PhantomData,
        }
    }

    /// Resolve the handler and return its lazy sequence.
    ///
    /// Nothing is produced until the returned stream is polled. Once the
    /// context's token fires, the stream yields one [`MediatorError::Canceled`]
    /// and ends, dropping the handler's stream.
    ///
    /// The handler runs under a child of the caller's token. Dropping the
    /// returned stream cancels that child, so work the handler started stops
    /// even when the caller never cancels.
    pub fn create(
        &self,
        request: S,
        resolver: &dyn HandlerResolver,
        ctx: RequestContext,
    ) -> Result<BoxStream<'static, Result<S::Item>>> {
        ctx.check_canceled()?;

        let handler: Arc<dyn StreamRequestHandler<S>> =
            resolve_one_as(resolver, &self.handler)?
                .ok_or(MediatorError::HandlerNotFound(self.handler.type_name))?;
        let behaviors: Vec<Arc<dyn StreamPipelineBehavior<S>>> =
            resolve_many_as(resolver, &self.behaviors)?;
        tracing::debug!(
            "Creating stream for {} ({} behaviors)",
            ctx.message_type(),
            behaviors.len()
        );

        let message_type = ctx.message_type();
        let token = ctx.cancellation_token().child_token();
        let guard = token.clone().drop_guard();
        let handler_ctx = RequestContext::with_cancellation(message_type, token.clone());
        let mut inner = StreamNext::new(request, handler_ctx, behaviors, handler).run();

        Ok(Box::pin(async_stream::stream! {
            // Held for the life of the stream; dropping it cancels the handler.
            let _guard = guard;
            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    item = inner.next() => Some(item),
                };
                match next {
                    None => {
                        tracing::debug!("Stream for {} canceled", message_type);
                        yield Err(MediatorError::Canceled);
                        break;
                    }
                    Some(Some(item)) => yield item,
                    Some(None) => break,
                }
            }
        }))
    }
}

impl<S: StreamRequest> Default for StreamWrapper<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StreamRequest> StreamWrapperBase for StreamWrapper<S> {
    fn message_type(&self) -> &'static str {
        self.handler.type_name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
