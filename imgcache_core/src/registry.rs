//! Static registry of bundled assets

use crate::entry::AssetHandle;
use std::collections::BTreeMap;

/// Maps semantic asset keys (`"logo-full"`) to loadable handles
///
/// The registry is fixed once the cache is built; keys iterate in sorted
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetRegistry {
    assets: BTreeMap<String, AssetHandle>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_asset(mut self, key: impl Into<String>, handle: impl Into<String>) -> Self {
        self.insert(key, handle);
        self
    }

    /// Register `key`, replacing any earlier handle
    pub fn insert(&mut self, key: impl Into<String>, handle: impl Into<String>) {
        self.assets.insert(key.into(), AssetHandle::new(handle));
    }

    pub fn resolve(&self, key: &str) -> Option<&AssetHandle> {
        self.assets.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.assets.contains_key(key)
    }

    /// Every registered key
    pub fn keys(&self) -> Vec<String> {
        self.assets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for AssetRegistry
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (key, handle) in iter {
            registry.insert(key, handle);
        }
        registry
    }
}
