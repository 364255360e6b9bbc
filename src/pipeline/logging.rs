//! Tracing behavior.

use std::marker::PhantomData;
use std::time::Instant;

use super::behavior::{Next, PipelineBehavior};
use crate::error::Result;
use crate::handler::{BoxFuture, RequestContext};
use crate::message::Request;

/// Logs start, completion and failure of a request with elapsed time.
pub struct LoggingBehavior<R: Request> {
    _phantom: PhantomData<fn(R)>,
}

impl<R: Request> LoggingBehavior<R> {
    /// Create a new logging behavior.
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<R: Request> Default for LoggingBehavior<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Request> PipelineBehavior<R> for LoggingBehavior<R> {
    fn handle<'a>(
        &'a self,
        _request: &'a R,
        ctx: RequestContext,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, Result<R::Response>> {
        Box::pin(async move {
            let start = Instant::now();
            tracing::debug!("Handling {}", ctx.message_type());

            let result = next.run().await;
            match &result {
                Ok(_) => tracing::debug!(
                    "Handled {} in {:?}",
                    ctx.message_type(),
                    start.elapsed()
                ),
                Err(e) => tracing::debug!(
                    "{} failed after {:?}: {}",
                    ctx.message_type(),
                    start.elapsed(),
                    e
                ),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediatorError;

    struct Noop;

    impl Request for Noop {
        type Response = &'static str;
    }

    #[tokio::test]
    async fn test_passes_result_through() {
        let behavior = LoggingBehavior::<Noop>::new();

        let ok = behavior
            .handle(
                &Noop,
                RequestContext::new("Noop"),
                Next::<Noop>::new(|| Box::pin(async { Ok("done") })),
            )
            .await;
        assert_eq!(ok.unwrap(), "done");

        let err = behavior
            .handle(
                &Noop,
                RequestContext::new("Noop"),
                Next::<Noop>::new(|| Box::pin(async { Err(MediatorError::message("bad")) })),
            )
            .await;
        assert_eq!(err.unwrap_err().to_string(), "bad");
    }
}
