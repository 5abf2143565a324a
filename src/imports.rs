//! Lazy import registry: logical name → deferred symbol reference.
//!
//! Entity modules declare "I need symbol S from location L under name N" at
//! definition time, long before L exists. Nothing is loaded at registration;
//! the first [`resolve`](LazyImportRegistry::resolve) loads the location,
//! extracts the symbol and caches it on the entry. Errors surface only at
//! resolution time.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::entity::SymbolValue;
use crate::error::{CoriumResult, SymbolError};
use crate::module::ModuleLoader;

/// A registered deferred reference.
///
/// `name` (the map key) is chosen by the registrant and need not equal the
/// symbol's real name. The cached value survives re-registration of the
/// location; only a full registry clear drops it.
pub struct LazySymbolEntry {
    pub location: String,
    pub symbol_name: String,
    resolved: Option<SymbolValue>,
}

/// Name-keyed registry of deferred symbol references.
pub struct LazyImportRegistry {
    entries: DashMap<String, LazySymbolEntry>,
}

impl LazyImportRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register (or overwrite) the reference stored under `name`.
    ///
    /// No I/O, never fails. Last registration wins; an already-cached resolved
    /// value stays cached until [`clear`](Self::clear).
    pub fn register(
        &self,
        name: impl Into<String>,
        location: impl Into<String>,
        symbol_name: impl Into<String>,
    ) {
        let name = name.into();
        let location = location.into();
        let symbol_name = symbol_name.into();
        tracing::trace!(name = %name, location = %location, symbol = %symbol_name, "registered lazy import");

        match self.entries.entry(name) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.location = location;
                entry.symbol_name = symbol_name;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(LazySymbolEntry {
                    location,
                    symbol_name,
                    resolved: None,
                });
            }
        }
    }

    /// Resolve `name` to its symbol, loading and extracting on first use.
    ///
    /// A cached value is returned as-is with no load. No guard is held across
    /// the load, so module initializers may resolve other names freely.
    pub fn resolve(&self, loader: &ModuleLoader, name: &str) -> CoriumResult<SymbolValue> {
        let (location, symbol_name) = {
            let entry = self.entries.get(name).ok_or_else(|| SymbolError::Unregistered {
                name: name.to_string(),
            })?;
            if let Some(value) = &entry.resolved {
                return Ok(value.clone());
            }
            (entry.location.clone(), entry.symbol_name.clone())
        };

        let value = load_and_extract(loader, &location, &symbol_name)?;

        // The entry may have been cleared while we loaded; cache only if it
        // still exists.
        if let Some(mut entry) = self.entries.get_mut(name) {
            entry.resolved = Some(value.clone());
        }
        tracing::debug!(name = %name, location = %location, symbol = %symbol_name, "resolved lazy import");
        Ok(value)
    }

    /// Load `location` and extract `symbol_name` without touching the
    /// name-keyed registry or its cache.
    ///
    /// Each call re-extracts; the loader's own module cache still applies.
    pub fn resolve_direct(
        &self,
        loader: &ModuleLoader,
        location: &str,
        symbol_name: &str,
    ) -> CoriumResult<SymbolValue> {
        load_and_extract(loader, location, symbol_name)
    }

    /// Whether `name` has been registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names registered but not yet resolved.
    pub fn pending(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.value().resolved.is_none())
            .map(|e| e.key().clone())
            .collect()
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries, cached values included.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for LazyImportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LazyImportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyImportRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn load_and_extract(
    loader: &ModuleLoader,
    location: &str,
    symbol_name: &str,
) -> CoriumResult<SymbolValue> {
    let module = loader.load(location)?;
    module.get(symbol_name).ok_or_else(|| {
        SymbolError::MissingSymbol {
            location: location.to_string(),
            symbol: symbol_name.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::CoriumError;
    use crate::module::Module;

    fn loader_with_order_module() -> ModuleLoader {
        let loader = ModuleLoader::new();
        loader.register("models.order", || {
            Ok(Module::new("models.order").export("Order", "order-descriptor".to_string()))
        });
        loader
    }

    #[test]
    fn register_then_resolve_round_trips() {
        let loader = loader_with_order_module();
        let registry = LazyImportRegistry::new();
        registry.register("Order", "models.order", "Order");

        let value = registry.resolve(&loader, "Order").unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "order-descriptor");
    }

    #[test]
    fn resolve_caches_with_object_identity() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let loader = ModuleLoader::new();
        loader.register("models.order", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Module::new("models.order").export("Order", "order-descriptor".to_string()))
        });

        let registry = LazyImportRegistry::new();
        registry.register("Order", "models.order", "Order");

        let first = registry.resolve(&loader, "Order").unwrap();
        let second = registry.resolve(&loader, "Order").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistered_name_fails() {
        let loader = ModuleLoader::new();
        let registry = LazyImportRegistry::new();

        let err = registry.resolve(&loader, "never-registered").unwrap_err();
        match err {
            CoriumError::Symbol(SymbolError::Unregistered { name }) => {
                assert_eq!(name, "never-registered");
            }
            other => panic!("expected Unregistered, got {other:?}"),
        }
    }

    #[test]
    fn missing_symbol_fails_without_caching() {
        let loader = loader_with_order_module();
        let registry = LazyImportRegistry::new();
        registry.register("Order", "models.order", "Oder");

        let err = registry.resolve(&loader, "Order").unwrap_err();
        assert!(matches!(
            err,
            CoriumError::Symbol(SymbolError::MissingSymbol { .. })
        ));
        assert_eq!(registry.pending(), vec!["Order".to_string()]);

        // Fixing the registration makes the same name resolvable.
        registry.register("Order", "models.order", "Order");
        registry.resolve(&loader, "Order").unwrap();
        assert!(registry.pending().is_empty());
    }

    #[test]
    fn overwrite_before_resolution_retargets() {
        let loader = ModuleLoader::new();
        loader.register("models.order", || {
            Ok(Module::new("models.order").export("Order", "v1".to_string()))
        });
        loader.register("models.order_v2", || {
            Ok(Module::new("models.order_v2").export("Order", "v2".to_string()))
        });

        let registry = LazyImportRegistry::new();
        registry.register("Order", "models.order", "Order");
        registry.register("Order", "models.order_v2", "Order");

        let value = registry.resolve(&loader, "Order").unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "v2");
    }

    #[test]
    fn overwrite_keeps_cached_value() {
        let loader = ModuleLoader::new();
        loader.register("models.order", || {
            Ok(Module::new("models.order").export("Order", "v1".to_string()))
        });
        loader.register("models.order_v2", || {
            Ok(Module::new("models.order_v2").export("Order", "v2".to_string()))
        });

        let registry = LazyImportRegistry::new();
        registry.register("Order", "models.order", "Order");
        let cached = registry.resolve(&loader, "Order").unwrap();

        // Re-registration overwrites the target but not the cache.
        registry.register("Order", "models.order_v2", "Order");
        let still_cached = registry.resolve(&loader, "Order").unwrap();
        assert!(Arc::ptr_eq(&cached, &still_cached));
        assert_eq!(still_cached.downcast_ref::<String>().unwrap(), "v1");
    }

    #[test]
    fn resolve_direct_skips_the_name_cache() {
        let registry = LazyImportRegistry::new();
        let loader = loader_with_order_module();

        // No registration needed.
        let value = registry
            .resolve_direct(&loader, "models.order", "Order")
            .unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "order-descriptor");
        assert!(registry.is_empty());

        let err = registry
            .resolve_direct(&loader, "models.order", "Oder")
            .unwrap_err();
        assert!(matches!(
            err,
            CoriumError::Symbol(SymbolError::MissingSymbol { .. })
        ));
    }

    #[test]
    fn clear_drops_entries_and_caches() {
        let loader = loader_with_order_module();
        let registry = LazyImportRegistry::new();
        registry.register("Order", "models.order", "Order");
        registry.resolve(&loader, "Order").unwrap();

        registry.clear();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.resolve(&loader, "Order").unwrap_err(),
            CoriumError::Symbol(SymbolError::Unregistered { .. })
        ));
    }

    #[test]
    fn pending_lists_only_unresolved_names() {
        let loader = loader_with_order_module();
        let registry = LazyImportRegistry::new();
        registry.register("Order", "models.order", "Order");
        registry.register("Supplier", "models.supplier", "Supplier");

        registry.resolve(&loader, "Order").unwrap();
        assert_eq!(registry.pending(), vec!["Supplier".to_string()]);
    }
}
