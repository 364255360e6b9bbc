//! Concurrent memo of dispatch wrappers.
//!
//! Wrappers are stateless plans, so the cache never invalidates. Two callers
//! racing on a cold key may both run the factory; only the first insert is
//! kept and every caller gets that one back.

use dashmap::DashMap;

use super::{DispatchKey, DispatchWrapper};

/// Mapping from runtime message type to its dispatch wrapper.
#[derive(Debug, Default)]
pub struct DispatchCache {
    wrappers: DashMap<DispatchKey, DispatchWrapper>,
}

impl DispatchCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached wrapper for `key`, building it with `build` on a miss.
    ///
    /// `build` runs without any shard lock held.
    pub fn get_or_build<F>(&self, key: DispatchKey, build: F) -> DispatchWrapper
    where
        F: FnOnce() -> DispatchWrapper,
    {
        if let Some(wrapper) = self.get(&key) {
            return wrapper;
        }

        let built = build();
        tracing::debug!("Built dispatch wrapper for {:?}", key);
        self.wrappers.entry(key).or_insert(built).value().clone()
    }

    /// Cached wrapper for `key`, if any.
    pub fn get(&self, key: &DispatchKey) -> Option<DispatchWrapper> {
        self.wrappers.get(key).map(|entry| entry.value().clone())
    }

    /// Whether `key` has a cached wrapper.
    pub fn contains(&self, key: &DispatchKey) -> bool {
        self.wrappers.contains_key(key)
    }

    /// Number of cached wrappers.
    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }
}
