//! Resolver facade: top-level API for deferred symbol and relationship binding.
//!
//! The `Resolver` owns the module loader and both registries and exposes the
//! call surface entity modules use: declare at definition time, resolve lazily
//! on first use or eagerly via one startup sweep. Applications either hold a
//! shared `Arc<Resolver>` or go through the process-wide instance in
//! [`crate::global`].

use std::sync::Arc;

use serde::Serialize;

use crate::entity::{RelationshipHost, RelationshipValue, SymbolValue, as_entity};
use crate::error::{CoriumResult, RelationshipError};
use crate::imports::LazyImportRegistry;
use crate::module::{InitError, Module, ModuleLoader};
use crate::relationship::{RelationshipRegistry, SweepReport};

/// Registered-but-unresolved state, for startup diagnostics.
///
/// Surfaces dangling declarations before they cause a failure deep inside
/// unrelated code. All lists are sorted for stable output.
#[derive(Debug, Clone, Serialize)]
pub struct ResolverDiagnostics {
    /// Lazy import names never resolved.
    pub pending_imports: Vec<String>,
    /// Relationship keys never successfully resolved.
    pub pending_relationships: Vec<String>,
    /// Locations with loaded module objects.
    pub loaded_locations: Vec<String>,
}

impl ResolverDiagnostics {
    /// Whether every registered declaration has been resolved.
    pub fn is_clean(&self) -> bool {
        self.pending_imports.is_empty() && self.pending_relationships.is_empty()
    }
}

/// Deferred-binding engine: module loader plus the two registries.
pub struct Resolver {
    loader: ModuleLoader,
    imports: LazyImportRegistry,
    relationships: RelationshipRegistry,
}

impl Resolver {
    /// Create a new empty resolver.
    pub fn new() -> Self {
        Self {
            loader: ModuleLoader::new(),
            imports: LazyImportRegistry::new(),
            relationships: RelationshipRegistry::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Module layer
    // -----------------------------------------------------------------------

    /// Register (or overwrite) the initializer for a module location.
    pub fn register_module<F>(&self, location: impl Into<String>, init: F)
    where
        F: Fn() -> Result<Module, InitError> + Send + Sync + 'static,
    {
        self.loader.register(location, init);
    }

    /// Load and return a whole module, for callers that need several symbols
    /// from one location.
    pub fn get_module(&self, location: &str) -> CoriumResult<Arc<Module>> {
        self.loader.load(location)
    }

    /// Load a location and extract one symbol in a single call.
    ///
    /// Primarily for test and diagnostic code that wants a symbol without the
    /// name-registry indirection.
    pub fn get_class(&self, location: &str, symbol_name: &str) -> CoriumResult<SymbolValue> {
        self.imports.resolve_direct(&self.loader, location, symbol_name)
    }

    // -----------------------------------------------------------------------
    // Lazy imports
    // -----------------------------------------------------------------------

    /// Declare that `name` refers to `symbol_name` at `location`.
    ///
    /// No I/O happens here; errors are detected only at resolution time.
    pub fn register_lazy_import(
        &self,
        name: impl Into<String>,
        location: impl Into<String>,
        symbol_name: impl Into<String>,
    ) {
        self.imports.register(name, location, symbol_name);
    }

    /// Resolve a registered name, loading and extracting on first use.
    pub fn resolve_lazy_import(&self, name: &str) -> CoriumResult<SymbolValue> {
        self.imports.resolve(&self.loader, name)
    }

    /// Direct variant: load and extract without prior registration, bypassing
    /// the name-keyed cache.
    pub fn lazy_import(&self, location: &str, symbol_name: &str) -> CoriumResult<SymbolValue> {
        self.imports.resolve_direct(&self.loader, location, symbol_name)
    }

    // -----------------------------------------------------------------------
    // Relationships
    // -----------------------------------------------------------------------

    /// Declare a relationship on `owner`, defined by `builder`.
    pub fn register_relationship<F>(
        &self,
        owner: Arc<dyn RelationshipHost>,
        name: impl Into<String>,
        builder: F,
    ) where
        F: Fn() -> CoriumResult<RelationshipValue> + Send + Sync + 'static,
    {
        self.relationships.register(owner, name, builder);
    }

    /// Resolve one relationship by invoking its builder. Builder failures
    /// propagate unwrapped.
    pub fn resolve_relationship(
        &self,
        owner: &dyn RelationshipHost,
        name: &str,
    ) -> CoriumResult<RelationshipValue> {
        self.relationships.resolve(owner, name)
    }

    /// Resolve and assign every registered relationship, tolerating per-item
    /// failures. See [`SweepReport`] for the outcome.
    pub fn resolve_lazy_relationships(&self) -> SweepReport {
        self.relationships.resolve_all()
    }

    // -----------------------------------------------------------------------
    // Lifecycle & observability
    // -----------------------------------------------------------------------

    /// Snapshot of everything registered but not yet resolved.
    pub fn diagnostics(&self) -> ResolverDiagnostics {
        let mut pending_imports = self.imports.pending();
        pending_imports.sort();
        let mut pending_relationships: Vec<String> = self
            .relationships
            .pending()
            .into_iter()
            .map(|key| key.to_string())
            .collect();
        pending_relationships.sort();
        let mut loaded_locations = self.loader.loaded_locations();
        loaded_locations.sort();

        ResolverDiagnostics {
            pending_imports,
            pending_relationships,
            loaded_locations,
        }
    }

    /// Drop everything: registries, initializers and the module cache.
    ///
    /// Test isolation only; production code never calls this after startup.
    pub fn reset(&self) {
        self.imports.clear();
        self.relationships.clear();
        self.loader.clear();
        tracing::debug!("resolver reset");
    }

    /// Drop all registered relationships, leaving imports and modules intact.
    pub fn clear_relationship_caches(&self) {
        self.relationships.clear();
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("loader", &self.loader)
            .field("imports", &self.imports.len())
            .field("relationships", &self.relationships.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Canonical builders
// ---------------------------------------------------------------------------

/// Builder producing a single-target reference to the entity registered under
/// the lazy-import `name`.
///
/// The name is dereferenced at invocation time, so the target may be registered
/// after the relationship that points at it.
pub fn reference_to(
    resolver: &Arc<Resolver>,
    name: &str,
) -> impl Fn() -> CoriumResult<RelationshipValue> + Send + Sync + use<> {
    entity_reference(resolver.clone(), name.to_string(), false)
}

/// Builder producing a collection reference to the entity registered under the
/// lazy-import `name`.
pub fn collection_of(
    resolver: &Arc<Resolver>,
    name: &str,
) -> impl Fn() -> CoriumResult<RelationshipValue> + Send + Sync + use<> {
    entity_reference(resolver.clone(), name.to_string(), true)
}

fn entity_reference(
    resolver: Arc<Resolver>,
    name: String,
    collection: bool,
) -> impl Fn() -> CoriumResult<RelationshipValue> + Send + Sync + use<> {
    move || {
        let value = resolver.resolve_lazy_import(&name)?;
        let target = as_entity(&value).ok_or_else(|| RelationshipError::InvalidTarget {
            name: name.clone(),
        })?;
        Ok(if collection {
            RelationshipValue::Many(target)
        } else {
            RelationshipValue::One(target)
        })
    }
}
