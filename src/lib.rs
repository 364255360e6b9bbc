//! # mediator
//!
//! In-process mediator for typed requests, notifications and streams.
//!
//! A single [`Mediator`] routes:
//! - a [`Request`] to exactly one handler, through pre-processors, pipeline
//!   behaviors and post-processors
//! - a [`Notification`] to zero or more handlers under a [`PublishStrategy`]
//! - a [`StreamRequest`] to one handler producing a lazy, cancellable stream
//!
//! ## Architecture
//!
//! - **Registry**: [`HandlerRegistry`] holds handlers, behaviors and processors per message type
//! - **Dispatch**: one cached wrapper per message type knows what to resolve and how to run it
//! - **Pipeline**: behaviors nest around the handler, first registered outermost
//!
//! ## Example
//!
//! ```
//! use mediator::{handler_fn, HandlerRegistry, LoggingBehavior, Mediator, Request};
//!
//! #[derive(Clone)]
//! struct Ping(u32);
//!
//! impl Request for Ping {
//!     type Response = u32;
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> mediator::Result<()> {
//!     let mut registry = HandlerRegistry::new();
//!     registry.add_request_handler::<Ping, _>(handler_fn(|ping: Ping, _ctx| async move {
//!         Ok(ping.0 * 2)
//!     }))?;
//!     registry.add_behavior::<Ping, _>(LoggingBehavior::new());
//!
//!     let mediator = Mediator::new(registry);
//!     assert_eq!(mediator.send(Ping(21)).await?, 42);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod message;
pub mod pipeline;

mod mediator;

pub use config::{MediatorConfig, PublishStrategy};
pub use error::{MediatorError, Result, ValidationFailure};
pub use handler::{
    handler_fn, notification_handler_fn, stream_handler_fn, HandlerRegistry, HandlerResolver,
    Lifetime, NotificationHandler, RequestContext, RequestHandler, Scope, StreamRequestHandler,
};
pub use mediator::{Mediator, MediatorBuilder, MediatorStream};
pub use message::{Notification, Request, StreamRequest, Unit};
pub use pipeline::{
    LoggingBehavior, Next, PipelineBehavior, RequestExceptionAction, RequestExceptionHandler,
    RequestPostProcessor, RequestPreProcessor, StreamNext, StreamPipelineBehavior,
    ValidationBehavior, Validator,
};

/// Re-exported so callers can build cancellation signals without a direct
/// `tokio-util` dependency.
pub use tokio_util::sync::CancellationToken;
