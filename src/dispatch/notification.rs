//! Notification dispatch wrapper: fan-out under a [`PublishStrategy`].

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::join_all;

use crate::config::PublishStrategy;
use crate::error::{MediatorError, Result};
use crate::handler::resolver::resolve_many_as;
use crate::handler::{
    BoxFuture, HandlerResolver, NotificationHandler, RequestContext, ServiceKey, ServiceKind,
};
use crate::message::Notification;

/// Type-erased view of a [`NotificationWrapper`].
pub trait NotificationWrapperBase: Send + Sync + 'static {
    /// Name of the notification type.
    fn message_type(&self) -> &'static str;

    /// Access to the concrete wrapper for typed dispatch.
    fn as_any(&self) -> &dyn Any;

    /// Publish a type-erased notification.
    fn publish_erased<'a>(
        &'a self,
        notification: &'a (dyn Any + Send + Sync),
        resolver: &'a dyn HandlerResolver,
        strategy: PublishStrategy,
        ctx: RequestContext,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Dispatch plan for notification type `N`.
pub struct NotificationWrapper<N: Notification> {
    handlers: ServiceKey,
    _phantom: PhantomData<fn(N)>,
}

impl<N: Notification> NotificationWrapper<N> {
    /// Build the plan.
    pub fn new() -> Self {
        Self {
            handlers: ServiceKey::of::<N>(ServiceKind::NotificationHandler),
            _phantom: PhantomData,
        }
    }

    /// Deliver `notification` to every resolved handler.
    pub async fn handle(
        &self,
        notification: &N,
        resolver: &dyn HandlerResolver,
        strategy: PublishStrategy,
        ctx: RequestContext,
    ) -> Result<()> {
        ctx.check_canceled()?;

        let handlers: Vec<Arc<dyn NotificationHandler<N>>> =
            resolve_many_as(resolver, &self.handlers)?;
        tracing::debug!(
            "Publishing {} to {} handler(s) ({})",
            ctx.message_type(),
            handlers.len(),
            strategy
        );
        if handlers.is_empty() {
            return Ok(());
        }

        match strategy {
            PublishStrategy::Parallel => publish_parallel(&handlers, notification, &ctx).await,
            PublishStrategy::Sequential => publish_sequential(&handlers, notification, &ctx).await,
            PublishStrategy::SequentialStopOnFailure => {
                for handler in &handlers {
                    ctx.run(handler.handle(notification, ctx.clone())).await?;
                }
                Ok(())
            }
        }
    }
}

async fn publish_parallel<N: Notification>(
    handlers: &[Arc<dyn NotificationHandler<N>>],
    notification: &N,
    ctx: &RequestContext,
) -> Result<()> {
    let pending = handlers
        .iter()
        .map(|handler| handler.handle(notification, ctx.clone()));
    let results = ctx.run(async { Ok(join_all(pending).await) }).await?;

    let failures: Vec<MediatorError> = results.into_iter().filter_map(Result::err).collect();
    if failures.is_empty() {
        return Ok(());
    }
    for failure in &failures {
        tracing::warn!("Handler for {} failed: {}", ctx.message_type(), failure);
    }
    if ctx.is_canceled() {
        tracing::warn!(
            "Publishing {} canceled, discarding {} failure(s)",
            ctx.message_type(),
            failures.len()
        );
        return Err(MediatorError::Canceled);
    }
    Err(MediatorError::AggregateNotificationFailure(failures))
}

async fn publish_sequential<N: Notification>(
    handlers: &[Arc<dyn NotificationHandler<N>>],
    notification: &N,
    ctx: &RequestContext,
) -> Result<()> {
    let mut failures = Vec::new();
    for (index, handler) in handlers.iter().enumerate() {
        match ctx.run(handler.handle(notification, ctx.clone())).await {
            Ok(()) => {}
            Err(err) if err.is_canceled() => {
                if !failures.is_empty() {
                    tracing::warn!(
                        "Publishing {} canceled, discarding {} failure(s)",
                        ctx.message_type(),
                        failures.len()
                    );
                }
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(
                    "Handler {} for {} failed, continuing: {}",
                    index,
                    ctx.message_type(),
                    err
                );
                failures.push(err);
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(MediatorError::AggregateNotificationFailure(failures))
    }
}

impl<N: Notification> Default for NotificationWrapper<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Notification> NotificationWrapperBase for NotificationWrapper<N> {
    fn message_type(&self) -> &'static str {
        self.handlers.type_name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn publish_erased<'a>(
        &'a self,
        notification: &'a (dyn Any + Send + Sync),
        resolver: &'a dyn HandlerResolver,
        strategy: PublishStrategy,
        ctx: RequestContext,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let notification: &dyn Any = notification;
            let notification = notification.downcast_ref::<N>().ok_or_else(|| {
                MediatorError::TypeMismatch(format!("value is not a {}", self.message_type()))
            })?;
            self.handle(notification, resolver, strategy, ctx).await
        })
    }
}
