//! Notification handlers.

use std::future::Future;
use std::marker::PhantomData;

use super::{BoxFuture, RequestContext};
use crate::error::Result;
use crate::message::Notification;

/// Handles one notification type. Any number may be registered per type.
pub trait NotificationHandler<N: Notification>: Send + Sync + 'static {
    /// Handle a notification.
    fn handle<'a>(&'a self, notification: &'a N, ctx: RequestContext) -> BoxFuture<'a, Result<()>>;
}

/// Closure adapter for [`NotificationHandler`]; the notification is cloned.
pub struct FnNotificationHandler<F, N, Fut>
where
    F: Fn(N, RequestContext) -> Fut + Send + Sync + 'static,
    N: Notification + Clone,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(N) -> Fut>,
}

impl<F, N, Fut> NotificationHandler<N> for FnNotificationHandler<F, N, Fut>
where
    F: Fn(N, RequestContext) -> Fut + Send + Sync + 'static,
    N: Notification + Clone,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn handle<'a>(&'a self, notification: &'a N, ctx: RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin((self.handler)(notification.clone(), ctx))
    }
}

/// Build a notification handler from a closure.
pub fn notification_handler_fn<N, F, Fut>(handler: F) -> FnNotificationHandler<F, N, Fut>
where
    F: Fn(N, RequestContext) -> Fut + Send + Sync + 'static,
    N: Notification + Clone,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnNotificationHandler {
        handler,
        _phantom: PhantomData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct Tick;

    impl Notification for Tick {}

    #[tokio::test]
    async fn test_fn_notification_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let handler = notification_handler_fn(move |_: Tick, _ctx| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        handler.handle(&Tick, RequestContext::new("Tick")).await.unwrap();
        handler.handle(&Tick, RequestContext::new("Tick")).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
