//! Request context for handlers.
//!
//! Every handler, behavior and processor receives a [`RequestContext`]. It
//! carries the cancellation signal for the call and the name of the message
//! type being dispatched.
//!
//! # Example
//!
//! ```ignore
//! fn handle<'a>(&'a self, req: &'a Ping, ctx: RequestContext) -> BoxFuture<'a, Result<Pong>> {
//!     Box::pin(async move {
//!         ctx.check_canceled()?;
//!         Ok(Pong(req.0))
//!     })
//! }
//! ```

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{MediatorError, Result};

/// Context passed to handlers, behaviors and processors.
///
/// `RequestContext` is `Clone` and cheap to copy around: the underlying
/// cancellation token is reference counted and shared by every step of a
/// single `send`, `publish` or stream.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Type name of the message being dispatched.
    message_type: &'static str,
    /// Cancellation signal for the whole call.
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Create a context with a fresh cancellation token.
    pub fn new(message_type: &'static str) -> Self {
        Self {
            message_type,
            cancellation: CancellationToken::new(),
        }
    }

    /// Create a context bound to a cancellation token.
    pub fn with_cancellation(message_type: &'static str, cancellation: CancellationToken) -> Self {
        Self {
            message_type,
            cancellation,
        }
    }

    /// Get the dispatched message type name.
    #[inline]
    pub fn message_type(&self) -> &'static str {
        self.message_type
    }

    /// Get the cancellation token.
    #[inline]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether cancellation has been requested.
    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fail with [`MediatorError::Canceled`] if cancellation has been requested.
    pub fn check_canceled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(MediatorError::Canceled);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the call is canceled first.
    ///
    /// Cancellation wins ties: a future that is ready at the same moment the
    /// token fires still resolves to [`MediatorError::Canceled`].
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {
                tracing::debug!("Canceled while dispatching {}", self.message_type);
                Err(MediatorError::Canceled)
            }
            result = fut => result,
        }
    }
}
