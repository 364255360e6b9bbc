//! Exception actions and handlers.
//!
//! When the behavior chain or the handler fails, exception actions run first,
//! all of them, in registration order. Exception handlers run next; the first
//! one returning `Some(response)` recovers the call. Cancellation is never
//! offered to either.

use crate::error::{MediatorError, Result};
use crate::handler::{BoxFuture, RequestContext};
use crate::message::Request;

/// Observes a failed request. Cannot recover it.
pub trait RequestExceptionAction<R: Request>: Send + Sync + 'static {
    /// React to `error`.
    fn execute<'a>(
        &'a self,
        request: &'a R,
        error: &'a MediatorError,
        ctx: RequestContext,
    ) -> BoxFuture<'a, Result<()>>;
}

/// May turn a failed request into a response.
pub trait RequestExceptionHandler<R: Request>: Send + Sync + 'static {
    /// Return `Some(response)` to mark the failure handled.
    fn handle<'a>(
        &'a self,
        request: &'a R,
        error: &'a MediatorError,
        ctx: RequestContext,
    ) -> BoxFuture<'a, Result<Option<R::Response>>>;
}
