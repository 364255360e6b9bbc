//! Dispatch wrappers and the dispatch cache.
//!
//! A dispatch wrapper is the type-specialized plan for invoking one message
//! type: which service keys to resolve and how to run them. Wrappers are a
//! closed set of variants ([`DispatchWrapper`]), one trait per kind, built by a
//! [`WrapperFactory`] and memoized in the [`DispatchCache`] by
//! [`DispatchKey`].
//!
//! Typed entry points know the message type statically and build the wrapper
//! with [`request_factory`] and friends. Type-erased entry points look the
//! factory up in the resolver's registration-time dispatch table instead.

mod cache;
mod notification;
mod request;
mod stream;

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub use cache::DispatchCache;
pub use notification::{NotificationWrapper, NotificationWrapperBase};
pub use request::{RequestWrapper, RequestWrapperBase};
pub use stream::{StreamWrapper, StreamWrapperBase};

use crate::message::{Notification, Request, StreamRequest};

/// Which wrapper variant a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    /// Single-handler request/response.
    Request,
    /// Fan-out notification.
    Notification,
    /// Single-handler lazy stream.
    Stream,
}

/// Cache key: wrapper kind plus runtime message type.
///
/// Equality and hashing only consider the kind and the `TypeId`, so keys built
/// from a type-erased value match keys built from the static type.
#[derive(Clone, Copy)]
pub struct DispatchKey {
    /// Wrapper kind.
    pub kind: WrapperKind,
    /// Runtime message type.
    pub type_id: TypeId,
    /// Message type name, when known.
    pub type_name: &'static str,
}

impl DispatchKey {
    /// Key for request type `R`.
    pub fn request<R: Request>() -> Self {
        Self::of::<R>(WrapperKind::Request)
    }

    /// Key for notification type `N`.
    pub fn notification<N: Notification>() -> Self {
        Self::of::<N>(WrapperKind::Notification)
    }

    /// Key for stream request type `S`.
    pub fn stream<S: StreamRequest>() -> Self {
        Self::of::<S>(WrapperKind::Stream)
    }

    /// Key for a type-erased value whose static type is unknown.
    pub fn erased(kind: WrapperKind, value: &(dyn Any + Send + Sync)) -> Self {
        let value: &dyn Any = value;
        Self {
            kind,
            type_id: value.type_id(),
            type_name: "<erased>",
        }
    }

    fn of<T: 'static>(kind: WrapperKind) -> Self {
        Self {
            kind,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl PartialEq for DispatchKey {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.type_id == other.type_id
    }
}

impl Eq for DispatchKey {}

impl Hash for DispatchKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.type_id.hash(state);
    }
}

impl fmt::Debug for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}<{}>", self.kind, self.type_name)
    }
}

/// A cached, type-specialized dispatch plan.
#[derive(Clone)]
pub enum DispatchWrapper {
    /// Plan for a request type.
    Request(Arc<dyn RequestWrapperBase>),
    /// Plan for a notification type.
    Notification(Arc<dyn NotificationWrapperBase>),
    /// Plan for a stream request type.
    Stream(Arc<dyn StreamWrapperBase>),
}

impl DispatchWrapper {
    /// Wrapper kind.
    pub fn kind(&self) -> WrapperKind {
        match self {
            DispatchWrapper::Request(_) => WrapperKind::Request,
            DispatchWrapper::Notification(_) => WrapperKind::Notification,
            DispatchWrapper::Stream(_) => WrapperKind::Stream,
        }
    }

    /// Name of the message type this wrapper dispatches.
    pub fn message_type(&self) -> &'static str {
        match self {
            DispatchWrapper::Request(w) => w.message_type(),
            DispatchWrapper::Notification(w) => w.message_type(),
            DispatchWrapper::Stream(w) => w.message_type(),
        }
    }
}

impl fmt::Debug for DispatchWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DispatchWrapper::{:?}<{}>", self.kind(), self.message_type())
    }
}

/// Non-generic constructor for a wrapper.
pub type WrapperFactory = fn() -> DispatchWrapper;

/// Build the wrapper for request type `R`.
pub fn request_factory<R: Request>() -> DispatchWrapper {
    DispatchWrapper::Request(Arc::new(RequestWrapper::<R>::new()))
}

/// Build the wrapper for notification type `N`.
pub fn notification_factory<N: Notification>() -> DispatchWrapper {
    DispatchWrapper::Notification(Arc::new(NotificationWrapper::<N>::new()))
}

/// Build the wrapper for stream request type `S`.
pub fn stream_factory<S: StreamRequest>() -> DispatchWrapper {
    DispatchWrapper::Stream(Arc::new(StreamWrapper::<S>::new()))
}
