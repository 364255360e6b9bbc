//! Message capabilities: requests, notifications and stream requests.
//!
//! A message is identified by its concrete Rust type. Implementing one of the
//! traits below is what makes a type routable through the
//! [`Mediator`](crate::Mediator).

/// A unit of work handled by exactly one handler that returns one response.
///
/// # Example
///
/// ```
/// use mediator::Request;
///
/// struct Ping(u32);
///
/// impl Request for Ping {
///     type Response = u32;
/// }
/// ```
pub trait Request: Send + Sync + 'static {
    /// Response produced by the handler.
    type Response: Send + Sync + 'static;
}

/// A broadcast delivered to zero or more handlers; no response.
pub trait Notification: Send + Sync + 'static {}

/// A unit of work whose single handler produces a lazy sequence of items.
pub trait StreamRequest: Send + 'static {
    /// Item type of the produced sequence.
    type Item: Send + 'static;
}

/// Response type for requests that return nothing meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Unit;
