//! Pipeline behaviors and the chain builder.
//!
//! Behaviors nest: the first registered behavior is the outermost one and
//! decides whether, when and how often the rest of the chain runs by calling
//! [`Next::run`].
//!
//! ```text
//! behavior 1 ─► behavior 2 ─► ... ─► handler
//!     ◄──────────── ◄────────── ◄───────┘
//! ```

use std::sync::Arc;

use crate::error::Result;
use crate::handler::{BoxFuture, RequestContext, RequestHandler};
use crate::message::Request;

type NextFn<'a, R> =
    dyn Fn() -> BoxFuture<'a, Result<<R as Request>::Response>> + Send + Sync + 'a;

/// The remainder of the pipeline below a behavior.
///
/// `Next` is cheap to clone and may be run more than once, which is how retry
/// behaviors are expressed.
pub struct Next<'a, R: Request> {
    inner: Arc<NextFn<'a, R>>,
}

impl<'a, R: Request> Clone for Next<'a, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<'a, R: Request> Next<'a, R> {
    /// Wrap a delegate as the next step.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> BoxFuture<'a, Result<R::Response>> + Send + Sync + 'a,
    {
        Self { inner: Arc::new(f) }
    }

    /// Terminal step invoking the request handler.
    pub fn handler(
        handler: &'a Arc<dyn RequestHandler<R>>,
        request: &'a R,
        ctx: &RequestContext,
    ) -> Self {
        let ctx = ctx.clone();
        Self::new(move || handler.handle(request, ctx.clone()))
    }

    /// Run the remainder of the pipeline.
    pub fn run(&self) -> BoxFuture<'a, Result<R::Response>> {
        (self.inner)()
    }
}

/// Middleware wrapping the handler invocation of one request type.
pub trait PipelineBehavior<R: Request>: Send + Sync + 'static {
    /// Handle the request, delegating to `next` to continue the pipeline.
    fn handle<'a>(
        &'a self,
        request: &'a R,
        ctx: RequestContext,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, Result<R::Response>>;
}

/// Fold `behaviors` right-to-left around `terminal` into one delegate.
///
/// The returned [`Next`] runs `behaviors[0]` first; the terminal step runs
/// innermost.
pub fn build_chain<'a, R: Request>(
    behaviors: &'a [Arc<dyn PipelineBehavior<R>>],
    request: &'a R,
    ctx: &RequestContext,
    terminal: Next<'a, R>,
) -> Next<'a, R> {
    behaviors.iter().rev().fold(terminal, |next, behavior| {
        let ctx = ctx.clone();
        Next::new(move || behavior.handle(request, ctx.clone(), next.clone()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediatorError;
    use std::sync::Mutex;

    struct Add(i32);

    impl Request for Add {
        type Response = i32;
    }

    struct Tracing {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl PipelineBehavior<Add> for Tracing {
        fn handle<'a>(
            &'a self,
            _request: &'a Add,
            _ctx: RequestContext,
            next: Next<'a, Add>,
        ) -> BoxFuture<'a, Result<i32>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(format!("{}:before", self.name));
                let out = next.run().await;
                self.log.lock().unwrap().push(format!("{}:after", self.name));
                out
            })
        }
    }

    struct Retry(usize);

    impl PipelineBehavior<Add> for Retry {
        fn handle<'a>(
            &'a self,
            _request: &'a Add,
            _ctx: RequestContext,
            next: Next<'a, Add>,
        ) -> BoxFuture<'a, Result<i32>> {
            Box::pin(async move {
                let mut last = None;
                for _ in 0..self.0 {
                    match next.run().await {
                        Ok(v) => return Ok(v),
                        Err(e) => last = Some(e),
                    }
                }
                Err(last.unwrap_or_else(|| MediatorError::message("no attempts")))
            })
        }
    }

    fn terminal<'a>(request: &'a Add, log: Arc<Mutex<Vec<String>>>) -> Next<'a, Add> {
        Next::new(move || {
            let log = log.clone();
            Box::pin(async move {
                log.lock().unwrap().push("handler".to_string());
                Ok(request.0 + 1)
            })
        })
    }

    #[tokio::test]
    async fn test_empty_chain_is_terminal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let request = Add(1);
        let ctx = RequestContext::new("Add");
        let chain = build_chain(&[], &request, &ctx, terminal(&request, log.clone()));

        assert_eq!(chain.run().await.unwrap(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["handler"]);
    }

    #[tokio::test]
    async fn test_chain_nests_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let behaviors: Vec<Arc<dyn PipelineBehavior<Add>>> = vec![
            Arc::new(Tracing { name: "outer", log: log.clone() }),
            Arc::new(Tracing { name: "inner", log: log.clone() }),
        ];
        let request = Add(41);
        let chain = build_chain(
            &behaviors,
            &request,
            &RequestContext::new("Add"),
            terminal(&request, log.clone()),
        );

        assert_eq!(chain.run().await.unwrap(), 42);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer:before", "inner:before", "handler", "inner:after", "outer:after"]
        );
    }

    #[tokio::test]
    async fn test_next_can_run_repeatedly() {
        let attempts = Arc::new(Mutex::new(0));
        let behaviors: Vec<Arc<dyn PipelineBehavior<Add>>> = vec![Arc::new(Retry(5))];
        let request = Add(0);
        let counter = attempts.clone();
        let flaky = Next::<Add>::new(move || {
            let counter = counter.clone();
            Box::pin(async move {
                let mut n = counter.lock().unwrap();
                *n += 1;
                if *n < 3 {
                    Err(MediatorError::message("flaky"))
                } else {
                    Ok(*n)
                }
            })
        });
        let chain = build_chain(&behaviors, &request, &RequestContext::new("Add"), flaky);

        assert_eq!(chain.run().await.unwrap(), 3);
        assert_eq!(*attempts.lock().unwrap(), 3);
    }
}
