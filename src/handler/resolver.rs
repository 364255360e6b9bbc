//! Resolution capability consumed by the mediator.
//!
//! The mediator never creates handler instances itself. It asks a
//! [`HandlerResolver`] for the instances registered under a [`ServiceKey`]
//! (service kind + message type) and invokes them. [`HandlerRegistry`] is the
//! in-memory implementation shipped with the crate; any container able to
//! answer the same queries can be plugged in instead.
//!
//! [`HandlerRegistry`]: super::HandlerRegistry

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::dispatch::{DispatchKey, WrapperFactory};
use crate::error::{MediatorError, Result};

/// A resolved service instance.
///
/// The concrete type behind the `Any` is the trait object `Arc` registered for
/// the key, e.g. `Arc<dyn RequestHandler<R>>` for a request handler.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// What role a registered service plays for its message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// `RequestHandler<R>`; at most one per request type.
    RequestHandler,
    /// `PipelineBehavior<R>`; ordered.
    Behavior,
    /// `RequestPreProcessor<R>`; ordered.
    PreProcessor,
    /// `RequestPostProcessor<R>`; ordered.
    PostProcessor,
    /// `RequestExceptionHandler<R>`; ordered.
    ExceptionHandler,
    /// `RequestExceptionAction<R>`; ordered.
    ExceptionAction,
    /// `NotificationHandler<N>`; ordered, possibly empty.
    NotificationHandler,
    /// `StreamRequestHandler<S>`; at most one per stream request type.
    StreamHandler,
    /// `StreamPipelineBehavior<S>`; ordered.
    StreamBehavior,
}

impl ServiceKind {
    /// Whether only one registration is allowed per message type.
    #[inline]
    pub fn is_single(self) -> bool {
        matches!(self, ServiceKind::RequestHandler | ServiceKind::StreamHandler)
    }
}

/// Lookup key: service kind plus message type.
///
/// Equality and hashing only consider the kind and the `TypeId`.
#[derive(Clone, Copy)]
pub struct ServiceKey {
    /// Service role.
    pub kind: ServiceKind,
    /// Message type identifier.
    pub type_id: TypeId,
    /// Message type name (diagnostics only).
    pub type_name: &'static str,
}

impl ServiceKey {
    /// Key for the given kind and message type `T`.
    pub fn of<T: 'static>(kind: ServiceKind) -> Self {
        Self {
            kind,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.type_id == other.type_id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}<{}>", self.kind, self.type_name)
    }
}

/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// A new instance for every resolution.
    Transient,
    /// One instance per [`Scope`](super::Scope); the root registry acts as its own scope.
    Scoped,
    /// One instance shared by everyone.
    #[default]
    Singleton,
}

/// Capability to produce registered service instances by key.
pub trait HandlerResolver: Send + Sync {
    /// First instance registered under `key`, if any.
    fn resolve_one(&self, key: &ServiceKey) -> Option<Instance>;

    /// Every instance registered under `key`, in registration order.
    fn resolve_many(&self, key: &ServiceKey) -> Vec<Instance>;

    /// Registration-time dispatch table used by the type-erased entry points.
    ///
    /// Resolvers that do not know message types up front return `None`, which
    /// makes `send_any`/`publish_any` fail with `TypeMismatch` for types the
    /// mediator has not already dispatched.
    fn dispatch_factory(&self, _key: &DispatchKey) -> Option<WrapperFactory> {
        None
    }
}

impl<T: HandlerResolver + ?Sized> HandlerResolver for Arc<T> {
    fn resolve_one(&self, key: &ServiceKey) -> Option<Instance> {
        (**self).resolve_one(key)
    }

    fn resolve_many(&self, key: &ServiceKey) -> Vec<Instance> {
        (**self).resolve_many(key)
    }

    fn dispatch_factory(&self, key: &DispatchKey) -> Option<WrapperFactory> {
        (**self).dispatch_factory(key)
    }
}

fn downcast<T: Clone + 'static>(key: &ServiceKey, instance: &Instance) -> Result<T> {
    instance.downcast_ref::<T>().cloned().ok_or_else(|| {
        MediatorError::TypeMismatch(format!(
            "{:?} resolved to an instance of the wrong type",
            key
        ))
    })
}

/// Resolve and downcast the first instance registered under `key`.
pub(crate) fn resolve_one_as<T: Clone + 'static>(
    resolver: &dyn HandlerResolver,
    key: &ServiceKey,
) -> Result<Option<T>> {
    resolver
        .resolve_one(key)
        .map(|instance| downcast(key, &instance))
        .transpose()
}

/// Resolve and downcast every instance registered under `key`.
pub(crate) fn resolve_many_as<T: Clone + 'static>(
    resolver: &dyn HandlerResolver,
    key: &ServiceKey,
) -> Result<Vec<T>> {
    resolver
        .resolve_many(key)
        .iter()
        .map(|instance| downcast(key, instance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Ping;
    struct Pong;

    struct MapResolver(HashMap<ServiceKey, Vec<Instance>>);

    impl HandlerResolver for MapResolver {
        fn resolve_one(&self, key: &ServiceKey) -> Option<Instance> {
            self.0.get(key).and_then(|v| v.first().cloned())
        }

        fn resolve_many(&self, key: &ServiceKey) -> Vec<Instance> {
            self.0.get(key).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn test_service_key_equality() {
        let a = ServiceKey::of::<Ping>(ServiceKind::RequestHandler);
        let b = ServiceKey::of::<Ping>(ServiceKind::RequestHandler);
        let c = ServiceKey::of::<Ping>(ServiceKind::Behavior);
        let d = ServiceKey::of::<Pong>(ServiceKind::RequestHandler);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(format!("{:?}", a).contains("Ping"));
    }

    #[test]
    fn test_single_kinds() {
        assert!(ServiceKind::RequestHandler.is_single());
        assert!(ServiceKind::StreamHandler.is_single());
        assert!(!ServiceKind::NotificationHandler.is_single());
        assert!(!ServiceKind::Behavior.is_single());
    }

    #[test]
    fn test_resolve_typed() {
        let key = ServiceKey::of::<Ping>(ServiceKind::NotificationHandler);
        let mut map = HashMap::new();
        map.insert(
            key,
            vec![Arc::new(1u32) as Instance, Arc::new(2u32) as Instance],
        );
        let resolver = MapResolver(map);

        let one: Option<u32> = resolve_one_as(&resolver, &key).unwrap();
        assert_eq!(one, Some(1));

        let many: Vec<u32> = resolve_many_as(&resolver, &key).unwrap();
        assert_eq!(many, vec![1, 2]);

        let missing: Option<u32> =
            resolve_one_as(&resolver, &ServiceKey::of::<Pong>(ServiceKind::RequestHandler))
                .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_resolve_wrong_type() {
        let key = ServiceKey::of::<Ping>(ServiceKind::RequestHandler);
        let mut map = HashMap::new();
        map.insert(key, vec![Arc::new("text") as Instance]);
        let resolver = MapResolver(map);

        let result: Result<Option<u32>> = resolve_one_as(&resolver, &key);
        assert!(matches!(result, Err(MediatorError::TypeMismatch(_))));
    }
}
