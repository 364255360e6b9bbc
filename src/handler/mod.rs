//! Handlers and handler resolution.
//!
//! Provides:
//! - [`RequestHandler`], [`NotificationHandler`], [`StreamRequestHandler`]: the
//!   handler capabilities
//! - [`HandlerResolver`] - how the mediator obtains handler instances
//! - [`HandlerRegistry`] - in-memory resolver with lifetimes and scopes
//! - [`RequestContext`] - per-call message name and cancellation token
//!
//! # Example
//!
//! ```
//! use mediator::{handler_fn, notification_handler_fn, HandlerRegistry, Notification, Request};
//!
//! #[derive(Clone)]
//! struct Echo(String);
//! impl Request for Echo {
//!     type Response = String;
//! }
//!
//! #[derive(Clone)]
//! struct Echoed;
//! impl Notification for Echoed {}
//!
//! let mut registry = HandlerRegistry::new();
//! registry
//!     .add_request_handler::<Echo, _>(handler_fn(|echo: Echo, _ctx| async move { Ok(echo.0) }))
//!     .unwrap();
//! registry.add_notification_handler::<Echoed, _>(notification_handler_fn(
//!     |_: Echoed, _ctx| async { Ok(()) },
//! ));
//! ```

mod context;
mod notification;
mod registry;
mod request;
pub(crate) mod resolver;
mod scope;
mod stream;

pub use context::RequestContext;
pub use notification::{notification_handler_fn, FnNotificationHandler, NotificationHandler};
pub use registry::HandlerRegistry;
pub use request::{handler_fn, BoxFuture, FnHandler, RequestHandler};
pub use resolver::{HandlerResolver, Instance, Lifetime, ServiceKey, ServiceKind};
pub use scope::Scope;
pub use stream::{stream_handler_fn, BoxStream, FnStreamHandler, StreamRequestHandler};
