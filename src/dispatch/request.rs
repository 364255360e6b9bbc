//! Request dispatch wrapper.
//!
//! ```text
//! Idle ─► PreProcessing ─► InPipeline ─► PostProcessing ─► Done
//!              │               │               │
//!              └───────────────┴───────────────┴─────────► Failed
//! ```

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{MediatorError, Result};
use crate::handler::resolver::{resolve_many_as, resolve_one_as};
use crate::handler::{
    BoxFuture, HandlerResolver, RequestContext, RequestHandler, ServiceKey, ServiceKind,
};
use crate::message::Request;
use crate::pipeline::{
    build_chain, Next, PipelineBehavior, RequestExceptionAction, RequestExceptionHandler,
    RequestPostProcessor, RequestPreProcessor,
};

/// Type-erased view of a [`RequestWrapper`].
pub trait RequestWrapperBase: Send + Sync + 'static {
    /// Name of the request type.
    fn message_type(&self) -> &'static str;

    /// Access to the concrete wrapper for typed dispatch.
    fn as_any(&self) -> &dyn Any;

    /// Dispatch a boxed request, returning the boxed response.
    fn handle_erased<'a>(
        &'a self,
        request: Box<dyn Any + Send + Sync>,
        resolver: &'a dyn HandlerResolver,
        ctx: RequestContext,
    ) -> BoxFuture<'a, Result<Box<dyn Any + Send>>>;
}

/// Service keys of every pipeline component for one request type.
struct RequestKeys {
    handler: ServiceKey,
    behaviors: ServiceKey,
    pre_processors: ServiceKey,
    post_processors: ServiceKey,
    exception_actions: ServiceKey,
    exception_handlers: ServiceKey,
}

/// Dispatch plan for request type `R`.
pub struct RequestWrapper<R: Request> {
    keys: RequestKeys,
    _phantom: PhantomData<fn(R)>,
}

impl<R: Request> RequestWrapper<R> {
    /// Build the plan. Never fails, even when nothing is registered for `R`.
    pub fn new() -> Self {
        Self {
            keys: RequestKeys {
                handler: ServiceKey::of::<R>(ServiceKind::RequestHandler),
                behaviors: ServiceKey::of::<R>(ServiceKind::Behavior),
                pre_processors: ServiceKey::of::<R>(ServiceKind::PreProcessor),
                post_processors: ServiceKey::of::<R>(ServiceKind::PostProcessor),
                exception_actions: ServiceKey::of::<R>(ServiceKind::ExceptionAction),
                exception_handlers: ServiceKey::of::<R>(ServiceKind::ExceptionHandler),
            },
            _phantom: PhantomData,
        }
    }

    /// Run the full pipeline for `request`.
    ///
    /// The handler is resolved before anything else runs: with no handler
    /// registered the call fails with [`MediatorError::HandlerNotFound`] and no
    /// pre-processor, behavior or post-processor is invoked.
    pub async fn handle(
        &self,
        request: &R,
        resolver: &dyn HandlerResolver,
        ctx: RequestContext,
    ) -> Result<R::Response> {
        ctx.check_canceled()?;

        let handler: Arc<dyn RequestHandler<R>> =
            resolve_one_as(resolver, &self.keys.handler)?
                .ok_or(MediatorError::HandlerNotFound(self.keys.handler.type_name))?;
        let pre_processors: Vec<Arc<dyn RequestPreProcessor<R>>> =
            resolve_many_as(resolver, &self.keys.pre_processors)?;
        let behaviors: Vec<Arc<dyn PipelineBehavior<R>>> =
            resolve_many_as(resolver, &self.keys.behaviors)?;
        let post_processors: Vec<Arc<dyn RequestPostProcessor<R>>> =
            resolve_many_as(resolver, &self.keys.post_processors)?;

        tracing::debug!(
            "Dispatching {} ({} pre, {} behaviors, {} post)",
            ctx.message_type(),
            pre_processors.len(),
            behaviors.len(),
            post_processors.len()
        );

        for processor in &pre_processors {
            ctx.run(processor.process(request, ctx.clone())).await?;
        }

        let terminal = Next::handler(&handler, request, &ctx);
        let chain = build_chain(&behaviors, request, &ctx, terminal);
        let response = match ctx.run(chain.run()).await {
            Ok(response) => response,
            Err(err) if err.is_canceled() => return Err(err),
            Err(err) => self.recover(request, err, resolver, &ctx).await?,
        };

        for processor in &post_processors {
            ctx.run(processor.process(request, &response, ctx.clone())).await?;
        }

        Ok(response)
    }

    /// Give exception actions and handlers a chance at a failed pipeline.
    async fn recover(
        &self,
        request: &R,
        err: MediatorError,
        resolver: &dyn HandlerResolver,
        ctx: &RequestContext,
    ) -> Result<R::Response> {
        let actions: Vec<Arc<dyn RequestExceptionAction<R>>> =
            resolve_many_as(resolver, &self.keys.exception_actions)?;
        for action in &actions {
            let outcome = ctx.run(action.execute(request, &err, ctx.clone())).await;
            if let Err(action_err) = outcome {
                if action_err.is_canceled() {
                    return Err(action_err);
                }
                tracing::warn!(
                    "Exception action for {} failed: {}",
                    ctx.message_type(),
                    action_err
                );
            }
        }

        let handlers: Vec<Arc<dyn RequestExceptionHandler<R>>> =
            resolve_many_as(resolver, &self.keys.exception_handlers)?;
        for handler in &handlers {
            let recovered = ctx.run(handler.handle(request, &err, ctx.clone())).await?;
            if let Some(response) = recovered {
                tracing::debug!("Recovered {} after: {}", ctx.message_type(), err);
                return Ok(response);
            }
        }

        Err(err)
    }
}

impl<R: Request> Default for RequestWrapper<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Request> RequestWrapperBase for RequestWrapper<R> {
    fn message_type(&self) -> &'static str {
        self.keys.handler.type_name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn handle_erased<'a>(
        &'a self,
        request: Box<dyn Any + Send + Sync>,
        resolver: &'a dyn HandlerResolver,
        ctx: RequestContext,
    ) -> BoxFuture<'a, Result<Box<dyn Any + Send>>> {
        Box::pin(async move {
            let request = request.downcast::<R>().map_err(|_| {
                MediatorError::TypeMismatch(format!("value is not a {}", self.message_type()))
            })?;
            let response = self.handle(&request, resolver, ctx).await?;
            Ok(Box::new(response) as Box<dyn Any + Send>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, HandlerRegistry};
    use std::sync::Mutex;

    #[derive(Clone)]
    struct Greet(&'static str);

    impl Request for Greet {
        type Response = String;
    }

    type Log = Arc<Mutex<Vec<String>>>;

    struct Pre(Log);

    impl RequestPreProcessor<Greet> for Pre {
        fn process<'a>(
            &'a self,
            _request: &'a Greet,
            _ctx: RequestContext,
        ) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                self.0.lock().unwrap().push("pre".into());
                Ok(())
            })
        }
    }

    struct Post(Log);

    impl RequestPostProcessor<Greet> for Post {
        fn process<'a>(
            &'a self,
            _request: &'a Greet,
            response: &'a String,
            _ctx: RequestContext,
        ) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                self.0.lock().unwrap().push(format!("post:{}", response));
                Ok(())
            })
        }
    }

    struct FailingPost;

    impl RequestPostProcessor<Greet> for FailingPost {
        fn process<'a>(
            &'a self,
            _request: &'a Greet,
            _response: &'a String,
            _ctx: RequestContext,
        ) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Err(MediatorError::message("audit failed")) })
        }
    }

    struct FailingPre;

    impl RequestPreProcessor<Greet> for FailingPre {
        fn process<'a>(
            &'a self,
            _request: &'a Greet,
            _ctx: RequestContext,
        ) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Err(MediatorError::message("pre failed")) })
        }
    }

    struct Outer(Log);

    impl PipelineBehavior<Greet> for Outer {
        fn handle<'a>(
            &'a self,
            _request: &'a Greet,
            _ctx: RequestContext,
            next: Next<'a, Greet>,
        ) -> BoxFuture<'a, Result<String>> {
            Box::pin(async move {
                self.0.lock().unwrap().push("behavior".into());
                next.run().await
            })
        }
    }

    struct Fallback;

    impl RequestExceptionHandler<Greet> for Fallback {
        fn handle<'a>(
            &'a self,
            _request: &'a Greet,
            _error: &'a MediatorError,
            _ctx: RequestContext,
        ) -> BoxFuture<'a, Result<Option<String>>> {
            Box::pin(async { Ok(Some("fallback".to_string())) })
        }
    }

    struct Record(Log);

    impl RequestExceptionAction<Greet> for Record {
        fn execute<'a>(
            &'a self,
            _request: &'a Greet,
            error: &'a MediatorError,
            _ctx: RequestContext,
        ) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                self.0.lock().unwrap().push(format!("action:{}", error));
                Ok(())
            })
        }
    }

    fn greet_handler(log: Log) -> impl RequestHandler<Greet> {
        handler_fn(move |req: Greet, _ctx| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push("handler".into());
                Ok(format!("hello {}", req.0))
            }
        })
    }

    fn ctx() -> RequestContext {
        RequestContext::new("Greet")
    }

    #[tokio::test]
    async fn test_full_pipeline_order() {
        let log: Log = Arc::default();
        let mut registry = HandlerRegistry::new();
        registry.add_request_handler::<Greet, _>(greet_handler(log.clone())).unwrap();
        registry
            .add_pre_processor::<Greet, _>(Pre(log.clone()))
            .add_post_processor::<Greet, _>(Post(log.clone()));

        let wrapper = RequestWrapper::<Greet>::new();
        let out = wrapper.handle(&Greet("bob"), &registry, ctx()).await.unwrap();

        assert_eq!(out, "hello bob");
        assert_eq!(*log.lock().unwrap(), vec!["pre", "handler", "post:hello bob"]);
    }

    #[tokio::test]
    async fn test_missing_handler_runs_nothing() {
        let log: Log = Arc::default();
        let mut registry = HandlerRegistry::new();
        registry.add_pre_processor::<Greet, _>(Pre(log.clone()));

        let wrapper = RequestWrapper::<Greet>::new();
        let err = wrapper.handle(&Greet("x"), &registry, ctx()).await.unwrap_err();

        assert!(matches!(err, MediatorError::HandlerNotFound(_)));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pre_processor_failure_stops_pipeline() {
        let log: Log = Arc::default();
        let mut registry = HandlerRegistry::new();
        registry.add_request_handler::<Greet, _>(greet_handler(log.clone())).unwrap();
        registry
            .add_pre_processor::<Greet, _>(FailingPre)
            .add_pre_processor::<Greet, _>(Pre(log.clone()))
            .add_behavior::<Greet, _>(Outer(log.clone()))
            .add_post_processor::<Greet, _>(Post(log.clone()));

        let wrapper = RequestWrapper::<Greet>::new();
        let err = wrapper.handle(&Greet("x"), &registry, ctx()).await.unwrap_err();

        assert_eq!(err.to_string(), "pre failed");
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_processor_failure_fails_call() {
        let log: Log = Arc::default();
        let mut registry = HandlerRegistry::new();
        registry.add_request_handler::<Greet, _>(greet_handler(log.clone())).unwrap();
        registry.add_post_processor::<Greet, _>(FailingPost);

        let wrapper = RequestWrapper::<Greet>::new();
        let err = wrapper.handle(&Greet("x"), &registry, ctx()).await.unwrap_err();

        assert_eq!(err.to_string(), "audit failed");
        assert_eq!(*log.lock().unwrap(), vec!["handler"]);
    }

    #[tokio::test]
    async fn test_exception_action_then_handler_recovers() {
        let log: Log = Arc::default();
        let mut registry = HandlerRegistry::new();
        registry
            .add_request_handler::<Greet, _>(handler_fn(|_: Greet, _ctx| async {
                Err::<String, _>(MediatorError::message("db down"))
            }))
            .unwrap();
        registry
            .add_exception_action::<Greet, _>(Record(log.clone()))
            .add_exception_handler::<Greet, _>(Fallback)
            .add_post_processor::<Greet, _>(Post(log.clone()));

        let wrapper = RequestWrapper::<Greet>::new();
        let out = wrapper.handle(&Greet("x"), &registry, ctx()).await.unwrap();

        assert_eq!(out, "fallback");
        assert_eq!(*log.lock().unwrap(), vec!["action:db down", "post:fallback"]);
    }

    #[tokio::test]
    async fn test_unhandled_failure_propagates_unchanged() {
        #[derive(Debug, thiserror::Error)]
        #[error("custom")]
        struct Custom;

        let mut registry = HandlerRegistry::new();
        registry
            .add_request_handler::<Greet, _>(handler_fn(|_: Greet, _ctx| async {
                Err::<String, _>(MediatorError::handler(Custom))
            }))
            .unwrap();

        let wrapper = RequestWrapper::<Greet>::new();
        let err = wrapper.handle(&Greet("x"), &registry, ctx()).await.unwrap_err();
        assert!(err.downcast_ref::<Custom>().is_some());
    }

    #[tokio::test]
    async fn test_erased_dispatch() {
        let log: Log = Arc::default();
        let mut registry = HandlerRegistry::new();
        registry.add_request_handler::<Greet, _>(greet_handler(log)).unwrap();

        let wrapper = RequestWrapper::<Greet>::new();
        let out = wrapper
            .handle_erased(Box::new(Greet("erased")), &registry, ctx())
            .await
            .unwrap();
        assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("hello erased"));

        let err = wrapper
            .handle_erased(Box::new(42u32), &registry, ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, MediatorError::TypeMismatch(_)));
    }
}
