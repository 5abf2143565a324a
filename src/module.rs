//! Module loader: the indirection table standing in for an import system.
//!
//! A location string (e.g. `"models.order"`) maps to a registered initializer
//! that builds a [`Module`], an immutable table of named exports. Loading a
//! location runs its initializer at most once: successful loads are cached as
//! shared module objects, failed loads are never cached and can be retried.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::entity::{EntityDescriptor, SymbolValue};
use crate::error::{CoriumResult, LoadFailure, SymbolError};

/// Error type module initializers may fail with.
pub type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Zero-argument initializer producing a module's export table.
pub type ModuleInit = Arc<dyn Fn() -> Result<Module, InitError> + Send + Sync>;

/// An immutable table of named exports, built once by a module initializer.
pub struct Module {
    location: String,
    exports: HashMap<String, SymbolValue>,
}

impl Module {
    /// Start an empty module for `location`.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            exports: HashMap::new(),
        }
    }

    /// Export `value` under `name`.
    pub fn export(mut self, name: impl Into<String>, value: impl std::any::Any + Send + Sync) -> Self {
        self.exports.insert(name.into(), Arc::new(value));
        self
    }

    /// Export an already type-erased value under `name`.
    ///
    /// Use this when several exports must share one allocation.
    pub fn export_value(mut self, name: impl Into<String>, value: SymbolValue) -> Self {
        self.exports.insert(name.into(), value);
        self
    }

    /// Export an entity descriptor under its own entity name.
    pub fn export_entity(self, entity: &Arc<EntityDescriptor>) -> Self {
        let value: SymbolValue = entity.clone();
        let name = entity.name().to_string();
        self.export_value(name, value)
    }

    /// The location this module was registered under.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Look up an export by name.
    pub fn get(&self, symbol: &str) -> Option<SymbolValue> {
        self.exports.get(symbol).cloned()
    }

    /// Names of all exports.
    pub fn symbols(&self) -> Vec<String> {
        self.exports.keys().cloned().collect()
    }

    /// Number of exports.
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    /// Whether the module exports nothing.
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("location", &self.location)
            .field("exports", &self.exports.len())
            .finish()
    }
}

/// Location → initializer registry with a loaded-module cache.
pub struct ModuleLoader {
    initializers: DashMap<String, ModuleInit>,
    loaded: DashMap<String, Arc<Module>>,
}

impl ModuleLoader {
    /// Create a new empty loader.
    pub fn new() -> Self {
        Self {
            initializers: DashMap::new(),
            loaded: DashMap::new(),
        }
    }

    /// Register (or overwrite) the initializer for `location`.
    ///
    /// Last registration wins. An already-loaded module stays cached; the new
    /// initializer only takes effect after [`clear`](Self::clear).
    pub fn register<F>(&self, location: impl Into<String>, init: F)
    where
        F: Fn() -> Result<Module, InitError> + Send + Sync + 'static,
    {
        let location = location.into();
        tracing::trace!(location = %location, "registered module initializer");
        self.initializers.insert(location, Arc::new(init));
    }

    /// Load `location`, running its initializer on first use.
    ///
    /// Successful loads are cached; failures are not, so a fixed initializer
    /// can be retried. The initializer runs outside any registry lock and may
    /// itself load other locations.
    pub fn load(&self, location: &str) -> CoriumResult<Arc<Module>> {
        if let Some(module) = self.loaded.get(location) {
            return Ok(module.clone());
        }

        let init = self
            .initializers
            .get(location)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SymbolError::Load {
                location: location.to_string(),
                source: LoadFailure::UnknownLocation,
            })?;

        let module = init().map_err(|source| SymbolError::Load {
            location: location.to_string(),
            source: LoadFailure::Init(source),
        })?;
        tracing::debug!(location = %location, exports = module.len(), "loaded module");

        // Two racing loads may both run the initializer; first insert wins so
        // every caller sees the same module object.
        let module = self
            .loaded
            .entry(location.to_string())
            .or_insert(Arc::new(module))
            .clone();
        Ok(module)
    }

    /// Whether `location` has been loaded and cached.
    pub fn is_loaded(&self, location: &str) -> bool {
        self.loaded.contains_key(location)
    }

    /// Locations with cached module objects.
    pub fn loaded_locations(&self) -> Vec<String> {
        self.loaded.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of registered initializers.
    pub fn len(&self) -> usize {
        self.initializers.len()
    }

    /// Whether no initializers are registered.
    pub fn is_empty(&self) -> bool {
        self.initializers.is_empty()
    }

    /// Drop all initializers and cached modules.
    pub fn clear(&self) {
        self.initializers.clear();
        self.loaded.clear();
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("initializers", &self.initializers.len())
            .field("loaded", &self.loaded.len())
            .finish()
    }
}
