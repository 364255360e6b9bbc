//! Resolution scopes for [`Lifetime::Scoped`](super::Lifetime::Scoped) services.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::registry::HandlerRegistry;
use super::resolver::{HandlerResolver, Instance, ServiceKey};
use crate::dispatch::{DispatchKey, WrapperFactory};

/// Memoized scoped instances, keyed by registration id.
#[derive(Default)]
pub(crate) struct ScopeCache {
    instances: Mutex<HashMap<usize, Instance>>,
}

impl ScopeCache {
    /// Return the cached instance for `id`, creating it on first use.
    pub(crate) fn get_or_create(&self, id: usize, create: impl FnOnce() -> Instance) -> Instance {
        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        instances.entry(id).or_insert_with(create).clone()
    }

    /// Number of scoped instances created so far.
    pub(crate) fn len(&self) -> usize {
        self.instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// A child resolver with its own set of scoped instances.
///
/// Singletons and transients behave exactly as in the parent registry;
/// scoped services are created once per `Scope` and dropped with it.
///
/// ```ignore
/// let registry = Arc::new(registry);
/// let scope = Arc::new(registry.scope());
/// let scoped = mediator.with_resolver(scope);
/// ```
pub struct Scope {
    registry: Arc<HandlerRegistry>,
    cache: ScopeCache,
}

impl Scope {
    pub(crate) fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            cache: ScopeCache::default(),
        }
    }

    /// Number of scoped instances created in this scope.
    pub fn instance_count(&self) -> usize {
        self.cache.len()
    }
}

impl HandlerResolver for Scope {
    fn resolve_one(&self, key: &ServiceKey) -> Option<Instance> {
        self.registry.resolve_one_in(key, &self.cache)
    }

    fn resolve_many(&self, key: &ServiceKey) -> Vec<Instance> {
        self.registry.resolve_many_in(key, &self.cache)
    }

    fn dispatch_factory(&self, key: &DispatchKey) -> Option<WrapperFactory> {
        self.registry.dispatch_factory(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_memoizes() {
        let cache = ScopeCache::default();
        let first = cache.get_or_create(1, || Arc::new(10u32) as Instance);
        let second = cache.get_or_create(1, || Arc::new(20u32) as Instance);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.downcast_ref::<u32>(), Some(&10));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_distinct_ids() {
        let cache = ScopeCache::default();
        cache.get_or_create(1, || Arc::new(1u32) as Instance);
        cache.get_or_create(2, || Arc::new(2u32) as Instance);
        assert_eq!(cache.len(), 2);
    }
}
