//! Mediator facade and builder.
//!
//! The [`Mediator`] is the single entry point for dispatch. Every call goes
//! through the same three steps:
//! 1. Look up (or build) the dispatch wrapper for the message type
//! 2. Create a [`RequestContext`] carrying the caller's cancellation token
//! 3. Run the wrapper against the resolver
//!
//! # Example
//!
//! ```
//! use mediator::{handler_fn, HandlerRegistry, Mediator, Request};
//!
//! #[derive(Clone)]
//! struct Ping(u32);
//!
//! impl Request for Ping {
//!     type Response = u32;
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> mediator::Result<()> {
//! let mut registry = HandlerRegistry::new();
//! registry.add_request_handler::<Ping, _>(handler_fn(|ping: Ping, _ctx| async move {
//!     Ok(ping.0 + 1)
//! }))?;
//!
//! let mediator = Mediator::builder().registry(registry).build();
//! assert_eq!(mediator.send(Ping(41)).await?, 42);
//! # Ok(())
//! # }
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{MediatorConfig, PublishStrategy};
use crate::dispatch::{
    notification_factory, request_factory, stream_factory, DispatchCache, DispatchKey,
    DispatchWrapper, NotificationWrapper, RequestWrapper, StreamWrapper, WrapperKind,
};
use crate::error::{MediatorError, Result};
use crate::handler::{BoxStream, HandlerRegistry, HandlerResolver, RequestContext};
use crate::message::{Notification, Request, StreamRequest};

/// Lazy sequence returned by [`Mediator::create_stream`].
pub type MediatorStream<T> = BoxStream<'static, Result<T>>;

/// Builder for a [`Mediator`].
pub struct MediatorBuilder {
    resolver: Option<Arc<dyn HandlerResolver>>,
    config: MediatorConfig,
}

impl MediatorBuilder {
    /// Create a builder with the default configuration and no resolver.
    pub fn new() -> Self {
        Self {
            resolver: None,
            config: MediatorConfig::default(),
        }
    }

    /// Resolve handlers from `registry`.
    pub fn registry(self, registry: HandlerRegistry) -> Self {
        self.resolver(registry)
    }

    /// Resolve handlers from any [`HandlerResolver`].
    pub fn resolver<T: HandlerResolver + 'static>(mut self, resolver: T) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Set the default publish strategy.
    ///
    /// Default: [`PublishStrategy::Sequential`]
    pub fn publish_strategy(mut self, strategy: PublishStrategy) -> Self {
        self.config.publish_strategy = strategy;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: MediatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the mediator. Without a resolver, an empty registry is used.
    pub fn build(self) -> Mediator {
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(HandlerRegistry::new()));
        Mediator {
            resolver,
            cache: Arc::new(DispatchCache::new()),
            config: self.config,
        }
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes requests, notifications and stream requests to their handlers.
///
/// Cloning is cheap; clones share the resolver and the dispatch cache.
#[derive(Clone)]
pub struct Mediator {
    resolver: Arc<dyn HandlerResolver>,
    cache: Arc<DispatchCache>,
    config: MediatorConfig,
}

impl Mediator {
    /// Create a mediator over `resolver` with the default configuration.
    pub fn new<T: HandlerResolver + 'static>(resolver: T) -> Self {
        MediatorBuilder::new().resolver(resolver).build()
    }

    /// Create a new builder.
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// A mediator resolving from `resolver` that shares this one's dispatch
    /// cache and configuration. Typically used with a
    /// [`Scope`](crate::handler::Scope).
    pub fn with_resolver<T: HandlerResolver + 'static>(&self, resolver: T) -> Self {
        Self {
            resolver: Arc::new(resolver),
            cache: Arc::clone(&self.cache),
            config: self.config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    /// The dispatch cache.
    pub fn cache(&self) -> &DispatchCache {
        &self.cache
    }

    // ---- send -----------------------------------------------------------

    /// Send a request to its single handler.
    pub async fn send<R: Request>(&self, request: R) -> Result<R::Response> {
        self.send_with(request, CancellationToken::new()).await
    }

    /// Send a request, observing `token` at every step.
    pub async fn send_with<R: Request>(
        &self,
        request: R,
        token: CancellationToken,
    ) -> Result<R::Response> {
        let ctx = RequestContext::with_cancellation(type_name::<R>(), token);
        ctx.check_canceled()?;

        let base = match self
            .cache
            .get_or_build(DispatchKey::request::<R>(), request_factory::<R>)
        {
            DispatchWrapper::Request(base) => base,
            other => return Err(unexpected_wrapper(&other)),
        };
        let wrapper = base
            .as_any()
            .downcast_ref::<RequestWrapper<R>>()
            .ok_or_else(|| wrapper_mismatch(type_name::<R>()))?;
        wrapper.handle(&request, self.resolver.as_ref(), ctx).await
    }

    /// Send a type-erased request; the boxed response has the request's
    /// response type.
    ///
    /// Fails with [`MediatorError::TypeMismatch`] if the value's type has no
    /// registered request handler.
    pub async fn send_any(
        &self,
        request: Box<dyn Any + Send + Sync>,
    ) -> Result<Box<dyn Any + Send>> {
        self.send_any_with(request, CancellationToken::new()).await
    }

    /// Type-erased [`send_with`](Self::send_with).
    pub async fn send_any_with(
        &self,
        request: Box<dyn Any + Send + Sync>,
        token: CancellationToken,
    ) -> Result<Box<dyn Any + Send>> {
        if token.is_cancelled() {
            return Err(MediatorError::Canceled);
        }

        let base = match self.erased_wrapper(WrapperKind::Request, request.as_ref())? {
            DispatchWrapper::Request(base) => base,
            other => return Err(unexpected_wrapper(&other)),
        };
        let ctx = RequestContext::with_cancellation(base.message_type(), token);
        base.handle_erased(request, self.resolver.as_ref(), ctx).await
    }

    // ---- publish --------------------------------------------------------

    /// Publish a notification with the configured strategy.
    pub async fn publish<N: Notification>(&self, notification: N) -> Result<()> {
        self.publish_with(notification, CancellationToken::new())
            .await
    }

    /// Publish with the configured strategy, observing `token`.
    pub async fn publish_with<N: Notification>(
        &self,
        notification: N,
        token: CancellationToken,
    ) -> Result<()> {
        self.publish_with_strategy(notification, self.config.publish_strategy, token)
            .await
    }

    /// Publish with an explicit strategy.
    pub async fn publish_with_strategy<N: Notification>(
        &self,
        notification: N,
        strategy: PublishStrategy,
        token: CancellationToken,
    ) -> Result<()> {
        let ctx = RequestContext::with_cancellation(type_name::<N>(), token);
        ctx.check_canceled()?;

        let base = match self
            .cache
            .get_or_build(DispatchKey::notification::<N>(), notification_factory::<N>)
        {
            DispatchWrapper::Notification(base) => base,
            other => return Err(unexpected_wrapper(&other)),
        };
        let wrapper = base
            .as_any()
            .downcast_ref::<NotificationWrapper<N>>()
            .ok_or_else(|| wrapper_mismatch(type_name::<N>()))?;
        wrapper
            .handle(&notification, self.resolver.as_ref(), strategy, ctx)
            .await
    }

    /// Publish a type-erased notification with the configured strategy.
    ///
    /// Fails with [`MediatorError::TypeMismatch`] if the value's type was never
    /// registered as a notification.
    pub async fn publish_any(&self, notification: Box<dyn Any + Send + Sync>) -> Result<()> {
        self.publish_any_with(notification, CancellationToken::new()).await
    }

    /// Type-erased [`publish_with`](Self::publish_with).
    pub async fn publish_any_with(
        &self,
        notification: Box<dyn Any + Send + Sync>,
        token: CancellationToken,
    ) -> Result<()> {
        if token.is_cancelled() {
            return Err(MediatorError::Canceled);
        }

        let base = match self.erased_wrapper(WrapperKind::Notification, notification.as_ref())? {
            DispatchWrapper::Notification(base) => base,
            other => return Err(unexpected_wrapper(&other)),
        };
        let ctx = RequestContext::with_cancellation(base.message_type(), token);
        base.publish_erased(
            notification.as_ref(),
            self.resolver.as_ref(),
            self.config.publish_strategy,
            ctx,
        )
        .await
    }

    // ---- streams --------------------------------------------------------

    /// Create the lazy sequence for a stream request.
    ///
    /// Fails immediately with [`MediatorError::HandlerNotFound`] if no handler
    /// is registered; otherwise nothing runs until the stream is polled.
    pub fn create_stream<S: StreamRequest>(&self, request: S) -> Result<MediatorStream<S::Item>> {
        self.create_stream_with(request, CancellationToken::new())
    }

    /// Create a stream that ends with [`MediatorError::Canceled`] once `token`
    /// fires.
    pub fn create_stream_with<S: StreamRequest>(
        &self,
        request: S,
        token: CancellationToken,
    ) -> Result<MediatorStream<S::Item>> {
        let ctx = RequestContext::with_cancellation(type_name::<S>(), token);
        ctx.check_canceled()?;

        let base = match self
            .cache
            .get_or_build(DispatchKey::stream::<S>(), stream_factory::<S>)
        {
            DispatchWrapper::Stream(base) => base,
            other => return Err(unexpected_wrapper(&other)),
        };
        let wrapper = base
            .as_any()
            .downcast_ref::<StreamWrapper<S>>()
            .ok_or_else(|| wrapper_mismatch(type_name::<S>()))?;
        wrapper.create(request, self.resolver.as_ref(), ctx)
    }

    fn erased_wrapper(
        &self,
        kind: WrapperKind,
        value: &(dyn Any + Send + Sync),
    ) -> Result<DispatchWrapper> {
        let key = DispatchKey::erased(kind, value);
        if let Some(wrapper) = self.cache.get(&key) {
            return Ok(wrapper);
        }
        let factory = self.resolver.dispatch_factory(&key).ok_or_else(|| {
            MediatorError::TypeMismatch(format!("value is not a registered {:?} type", kind))
        })?;
        Ok(self.cache.get_or_build(key, factory))
    }
}

impl fmt::Debug for Mediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mediator")
            .field("config", &self.config)
            .field("cached_wrappers", &self.cache.len())
            .finish()
    }
}

fn unexpected_wrapper(wrapper: &DispatchWrapper) -> MediatorError {
    MediatorError::TypeMismatch(format!("unexpected {:?}", wrapper))
}

fn wrapper_mismatch(message_type: &str) -> MediatorError {
    MediatorError::TypeMismatch(format!("cached wrapper does not dispatch {}", message_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, notification_handler_fn, stream_handler_fn};
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct Add(i32, i32);

    impl Request for Add {
        type Response = i32;
    }

    #[derive(Clone)]
    struct Saved;

    impl Notification for Saved {}

    struct Digits(u32);

    impl StreamRequest for Digits {
        type Item = u32;
    }

    fn mediator(calls: Arc<AtomicUsize>) -> Mediator {
        let mut registry = HandlerRegistry::new();
        let counter = calls.clone();
        registry
            .add_request_handler::<Add, _>(handler_fn(move |req: Add, _ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok(req.0 + req.1) }
            }))
            .unwrap();
        registry.add_notification_handler::<Saved, _>(notification_handler_fn(
            move |_: Saved, _ctx| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        ));
        registry
            .add_stream_handler::<Digits, _>(stream_handler_fn(|req: Digits, _ctx| {
                futures::stream::iter(0..req.0).map(Ok)
            }))
            .unwrap();
        Mediator::builder().registry(registry).build()
    }

    #[test]
    fn test_builder_defaults() {
        let mediator = Mediator::builder().build();
        assert_eq!(mediator.config().publish_strategy, PublishStrategy::Sequential);
        assert!(mediator.cache().is_empty());

        let mediator = Mediator::builder()
            .publish_strategy(PublishStrategy::Parallel)
            .build();
        assert_eq!(mediator.config().publish_strategy, PublishStrategy::Parallel);
    }

    #[tokio::test]
    async fn test_send_caches_wrapper() {
        let mediator = mediator(Arc::default());

        assert_eq!(mediator.send(Add(2, 3)).await.unwrap(), 5);
        assert_eq!(mediator.send(Add(4, 5)).await.unwrap(), 9);
        assert_eq!(mediator.cache().len(), 1);
        assert!(mediator.cache().contains(&DispatchKey::request::<Add>()));
    }

    #[tokio::test]
    async fn test_send_already_canceled_runs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mediator = mediator(calls.clone());
        let token = CancellationToken::new();
        token.cancel();

        let err = mediator.send_with(Add(1, 1), token.clone()).await.unwrap_err();
        assert!(err.is_canceled());
        let err = mediator.publish_with(Saved, token.clone()).await.unwrap_err();
        assert!(err.is_canceled());
        assert!(mediator.create_stream_with(Digits(3), token).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_any() {
        let mediator = mediator(Arc::default());

        let out = mediator.send_any(Box::new(Add(20, 22))).await.unwrap();
        assert_eq!(out.downcast_ref::<i32>(), Some(&42));

        let err = mediator.send_any(Box::new("nope")).await.unwrap_err();
        assert!(matches!(err, MediatorError::TypeMismatch(_)));
    }

    #[tokio::test]
    async fn test_publish_any() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mediator = mediator(calls.clone());

        mediator.publish_any(Box::new(Saved)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let err = mediator.publish_any(Box::new(Add(1, 2))).await.unwrap_err();
        assert!(matches!(err, MediatorError::TypeMismatch(_)));
    }

    #[tokio::test]
    async fn test_create_stream() {
        let mediator = mediator(Arc::default());

        let items: Vec<u32> = mediator
            .create_stream(Digits(3))
            .unwrap()
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(items, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_with_resolver_shares_cache() {
        let mediator = mediator(Arc::default());
        mediator.send(Add(1, 1)).await.unwrap();

        let other = mediator.with_resolver(HandlerRegistry::new());
        assert_eq!(other.cache().len(), 1);
        let err = other.send(Add(1, 1)).await.unwrap_err();
        assert!(matches!(err, MediatorError::HandlerNotFound(_)));
    }
}
