//! Pre- and post-processors.
//!
//! Processors run outside the behavior chain, strictly in registration order.
//! They observe or validate; the only way to stop a request is to fail.

use crate::error::Result;
use crate::handler::{BoxFuture, RequestContext};
use crate::message::Request;

/// Runs before any behavior or the handler.
pub trait RequestPreProcessor<R: Request>: Send + Sync + 'static {
    /// Inspect the request before it enters the pipeline.
    fn process<'a>(&'a self, request: &'a R, ctx: RequestContext) -> BoxFuture<'a, Result<()>>;
}

/// Runs after the handler (and every behavior) produced a response.
pub trait RequestPostProcessor<R: Request>: Send + Sync + 'static {
    /// Inspect the request and its final response.
    fn process<'a>(
        &'a self,
        request: &'a R,
        response: &'a R::Response,
        ctx: RequestContext,
    ) -> BoxFuture<'a, Result<()>>;
}
