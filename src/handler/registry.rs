//! In-memory handler registry.
//!
//! The registry maps a (service kind, message type) key to an ordered list of
//! registrations. Each registration carries a [`Lifetime`] and a factory; the
//! registry decides when the factory runs, the mediator only asks for
//! instances.
//!
//! Request and stream handlers are single-handler kinds: registering a second
//! one for the same type is rejected with
//! [`MediatorError::DuplicateHandler`].
//!
//! # Example
//!
//! ```ignore
//! use mediator::{handler_fn, HandlerRegistry};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.add_request_handler::<Ping, _>(handler_fn(|ping: Ping, _ctx| async move {
//!     Ok(ping.0)
//! }))?;
//! registry.add_behavior::<Ping, _>(LoggingBehavior::new());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::notification::NotificationHandler;
use super::request::RequestHandler;
use super::resolver::{HandlerResolver, Instance, Lifetime, ServiceKey, ServiceKind};
use super::scope::{Scope, ScopeCache};
use super::stream::StreamRequestHandler;
use crate::dispatch::{
    notification_factory, request_factory, stream_factory, DispatchKey, WrapperFactory,
};
use crate::error::{MediatorError, Result};
use crate::message::{Notification, Request, StreamRequest};
use crate::pipeline::{
    PipelineBehavior, RequestExceptionAction, RequestExceptionHandler, RequestPostProcessor,
    RequestPreProcessor, StreamPipelineBehavior,
};

type Factory = Arc<dyn Fn() -> Instance + Send + Sync>;

/// One registered service.
struct Registration {
    /// Unique id, used as the scoped-instance cache key.
    id: usize,
    /// Instance lifetime.
    lifetime: Lifetime,
    /// Produces a fresh instance.
    factory: Factory,
    /// Shared instance for [`Lifetime::Singleton`].
    singleton: OnceLock<Instance>,
}

/// Registry mapping message types to handlers, behaviors and processors.
pub struct HandlerRegistry {
    /// Registrations by key, in registration order.
    services: HashMap<ServiceKey, Vec<Registration>>,
    /// Wrapper constructors for every message type seen at registration.
    dispatch_table: HashMap<DispatchKey, WrapperFactory>,
    /// Next registration id to assign.
    next_id: usize,
    /// Scoped instances resolved directly from the registry.
    root: ScopeCache,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            dispatch_table: HashMap::new(),
            next_id: 1,
            root: ScopeCache::default(),
        }
    }

    fn register<T, F>(&mut self, key: ServiceKey, lifetime: Lifetime, factory: F) -> Result<()>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        if key.kind.is_single() && self.contains(&key) {
            return Err(MediatorError::DuplicateHandler(key.type_name));
        }
        self.push_registration(key, lifetime, factory);
        Ok(())
    }

    fn register_instance<T>(&mut self, key: ServiceKey, instance: T) -> Result<()>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.register(key, Lifetime::Singleton, move || instance.clone())
    }

    /// Append a registration without the single-handler check.
    ///
    /// Multi-registration kinds go straight here; single kinds only after
    /// [`HandlerRegistry::register`] has ruled out a duplicate.
    fn push_registration<T, F>(&mut self, key: ServiceKey, lifetime: Lifetime, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;

        self.services.entry(key).or_default().push(Registration {
            id,
            lifetime,
            factory: Arc::new(move || Arc::new(factory()) as Instance),
            singleton: OnceLock::new(),
        });
    }

    fn note_request<R: Request>(&mut self) {
        self.dispatch_table
            .insert(DispatchKey::request::<R>(), request_factory::<R>);
    }

    // ---- requests -------------------------------------------------------

    /// Register the handler for request type `R` as a singleton.
    pub fn add_request_handler<R, H>(&mut self, handler: H) -> Result<&mut Self>
    where
        R: Request,
        H: RequestHandler<R>,
    {
        let handler: Arc<dyn RequestHandler<R>> = Arc::new(handler);
        self.register_instance(ServiceKey::of::<R>(ServiceKind::RequestHandler), handler)?;
        self.note_request::<R>();
        Ok(self)
    }

    /// Register the handler for request type `R` with a factory and lifetime.
    pub fn add_request_handler_with<R, H, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&mut Self>
    where
        R: Request,
        H: RequestHandler<R>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.register(
            ServiceKey::of::<R>(ServiceKind::RequestHandler),
            lifetime,
            move || Arc::new(factory()) as Arc<dyn RequestHandler<R>>,
        )?;
        self.note_request::<R>();
        Ok(self)
    }

    /// Append a pipeline behavior for `R`. Earlier registrations wrap later ones.
    pub fn add_behavior<R, B>(&mut self, behavior: B) -> &mut Self
    where
        R: Request,
        B: PipelineBehavior<R>,
    {
        let behavior: Arc<dyn PipelineBehavior<R>> = Arc::new(behavior);
        self.push_instance::<R, _>(ServiceKind::Behavior, behavior)
    }

    /// Append a pipeline behavior for `R` built by a factory.
    pub fn add_behavior_with<R, B, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        R: Request,
        B: PipelineBehavior<R>,
        F: Fn() -> B + Send + Sync + 'static,
    {
        self.push_registration(ServiceKey::of::<R>(ServiceKind::Behavior), lifetime, move || {
            Arc::new(factory()) as Arc<dyn PipelineBehavior<R>>
        });
        self.note_request::<R>();
        self
    }

    /// Append a pre-processor for `R`.
    pub fn add_pre_processor<R, P>(&mut self, processor: P) -> &mut Self
    where
        R: Request,
        P: RequestPreProcessor<R>,
    {
        let processor: Arc<dyn RequestPreProcessor<R>> = Arc::new(processor);
        self.push_instance::<R, _>(ServiceKind::PreProcessor, processor)
    }

    /// Append a post-processor for `R`.
    pub fn add_post_processor<R, P>(&mut self, processor: P) -> &mut Self
    where
        R: Request,
        P: RequestPostProcessor<R>,
    {
        let processor: Arc<dyn RequestPostProcessor<R>> = Arc::new(processor);
        self.push_instance::<R, _>(ServiceKind::PostProcessor, processor)
    }

    /// Append an exception handler for `R`.
    pub fn add_exception_handler<R, H>(&mut self, handler: H) -> &mut Self
    where
        R: Request,
        H: RequestExceptionHandler<R>,
    {
        let handler: Arc<dyn RequestExceptionHandler<R>> = Arc::new(handler);
        self.push_instance::<R, _>(ServiceKind::ExceptionHandler, handler)
    }

    /// Append an exception action for `R`.
    pub fn add_exception_action<R, A>(&mut self, action: A) -> &mut Self
    where
        R: Request,
        A: RequestExceptionAction<R>,
    {
        let action: Arc<dyn RequestExceptionAction<R>> = Arc::new(action);
        self.push_instance::<R, _>(ServiceKind::ExceptionAction, action)
    }

    fn push_instance<R, T>(&mut self, kind: ServiceKind, instance: T) -> &mut Self
    where
        R: Request,
        T: Clone + Send + Sync + 'static,
    {
        self.push_registration(ServiceKey::of::<R>(kind), Lifetime::Singleton, move || {
            instance.clone()
        });
        self.note_request::<R>();
        self
    }

    // ---- notifications --------------------------------------------------

    /// Append a notification handler for `N` as a singleton.
    pub fn add_notification_handler<N, H>(&mut self, handler: H) -> &mut Self
    where
        N: Notification,
        H: NotificationHandler<N>,
    {
        let handler: Arc<dyn NotificationHandler<N>> = Arc::new(handler);
        self.push_registration(
            ServiceKey::of::<N>(ServiceKind::NotificationHandler),
            Lifetime::Singleton,
            move || handler.clone(),
        );
        self.declare_notification::<N>()
    }

    /// Append a notification handler for `N` built by a factory.
    pub fn add_notification_handler_with<N, H, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> &mut Self
    where
        N: Notification,
        H: NotificationHandler<N>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.push_registration(
            ServiceKey::of::<N>(ServiceKind::NotificationHandler),
            lifetime,
            move || Arc::new(factory()) as Arc<dyn NotificationHandler<N>>,
        );
        self.declare_notification::<N>()
    }

    /// Make `N` known to the type-erased publish path even without handlers.
    pub fn declare_notification<N: Notification>(&mut self) -> &mut Self {
        self.dispatch_table
            .insert(DispatchKey::notification::<N>(), notification_factory::<N>);
        self
    }

    // ---- streams --------------------------------------------------------

    /// Register the handler for stream request type `S` as a singleton.
    pub fn add_stream_handler<S, H>(&mut self, handler: H) -> Result<&mut Self>
    where
        S: StreamRequest,
        H: StreamRequestHandler<S>,
    {
        let handler: Arc<dyn StreamRequestHandler<S>> = Arc::new(handler);
        self.register_instance(ServiceKey::of::<S>(ServiceKind::StreamHandler), handler)?;
        self.note_stream::<S>();
        Ok(self)
    }

    /// Register the handler for stream request type `S` with a factory and lifetime.
    pub fn add_stream_handler_with<S, H, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&mut Self>
    where
        S: StreamRequest,
        H: StreamRequestHandler<S>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.register(
            ServiceKey::of::<S>(ServiceKind::StreamHandler),
            lifetime,
            move || Arc::new(factory()) as Arc<dyn StreamRequestHandler<S>>,
        )?;
        self.note_stream::<S>();
        Ok(self)
    }

    /// Append a stream behavior for `S`.
    pub fn add_stream_behavior<S, B>(&mut self, behavior: B) -> &mut Self
    where
        S: StreamRequest,
        B: StreamPipelineBehavior<S>,
    {
        let behavior: Arc<dyn StreamPipelineBehavior<S>> = Arc::new(behavior);
        self.push_registration(
            ServiceKey::of::<S>(ServiceKind::StreamBehavior),
            Lifetime::Singleton,
            move || behavior.clone(),
        );
        self.note_stream::<S>();
        self
    }

    fn note_stream<S: StreamRequest>(&mut self) {
        self.dispatch_table
            .insert(DispatchKey::stream::<S>(), stream_factory::<S>);
    }

    // ---- queries --------------------------------------------------------

    /// Number of registrations under `key`.
    pub fn registration_count(&self, key: &ServiceKey) -> usize {
        self.services.get(key).map_or(0, Vec::len)
    }

    /// Whether anything is registered under `key`.
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.registration_count(key) > 0
    }

    /// Create a child scope for [`Lifetime::Scoped`] services.
    pub fn scope(self: &Arc<Self>) -> Scope {
        Scope::new(Arc::clone(self))
    }

    fn provide(&self, registration: &Registration, cache: &ScopeCache) -> Instance {
        match registration.lifetime {
            Lifetime::Singleton => registration
                .singleton
                .get_or_init(|| (registration.factory)())
                .clone(),
            Lifetime::Scoped => cache.get_or_create(registration.id, || (registration.factory)()),
            Lifetime::Transient => (registration.factory)(),
        }
    }

    pub(crate) fn resolve_one_in(&self, key: &ServiceKey, cache: &ScopeCache) -> Option<Instance> {
        let registration = self.services.get(key)?.first()?;
        Some(self.provide(registration, cache))
    }

    pub(crate) fn resolve_many_in(&self, key: &ServiceKey, cache: &ScopeCache) -> Vec<Instance> {
        self.services
            .get(key)
            .map(|entries| {
                entries
                    .iter()
                    .map(|registration| self.provide(registration, cache))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerResolver for HandlerRegistry {
    fn resolve_one(&self, key: &ServiceKey) -> Option<Instance> {
        self.resolve_one_in(key, &self.root)
    }

    fn resolve_many(&self, key: &ServiceKey) -> Vec<Instance> {
        self.resolve_many_in(key, &self.root)
    }

    fn dispatch_factory(&self, key: &DispatchKey) -> Option<WrapperFactory> {
        self.dispatch_table.get(key).copied()
    }
}
