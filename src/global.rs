//! Process-wide resolver and the function-call API entity modules consume.
//!
//! The registries live for the whole process: created empty at startup, grown
//! as entity modules declare themselves, cleared only by the test-only
//! [`reset`]. Callers that prefer an injected instance over process-wide state
//! can take [`resolver`] (or build their own [`Resolver`]) and use its methods
//! directly; the free functions below are thin delegates.

use std::sync::{Arc, LazyLock};

use crate::entity::{RelationshipHost, RelationshipValue, SymbolValue};
use crate::error::CoriumResult;
use crate::module::{InitError, Module};
use crate::relationship::SweepReport;
use crate::resolver::{Resolver, ResolverDiagnostics};

static RESOLVER: LazyLock<Arc<Resolver>> = LazyLock::new(|| Arc::new(Resolver::new()));

/// The process-wide resolver instance.
pub fn resolver() -> &'static Arc<Resolver> {
    &RESOLVER
}

/// Register (or overwrite) the initializer for a module location.
pub fn register_module<F>(location: impl Into<String>, init: F)
where
    F: Fn() -> Result<Module, InitError> + Send + Sync + 'static,
{
    RESOLVER.register_module(location, init);
}

/// Declare that `name` refers to `symbol_name` at `location`.
pub fn register_lazy_import(
    name: impl Into<String>,
    location: impl Into<String>,
    symbol_name: impl Into<String>,
) {
    RESOLVER.register_lazy_import(name, location, symbol_name);
}

/// Resolve a registered name, loading and extracting on first use.
pub fn resolve_lazy_import(name: &str) -> CoriumResult<SymbolValue> {
    RESOLVER.resolve_lazy_import(name)
}

/// Direct variant: load and extract without prior registration.
pub fn lazy_import(location: &str, symbol_name: &str) -> CoriumResult<SymbolValue> {
    RESOLVER.lazy_import(location, symbol_name)
}

/// Load and return a whole module.
pub fn get_module(location: &str) -> CoriumResult<Arc<Module>> {
    RESOLVER.get_module(location)
}

/// Load a location and extract one symbol in a single call.
pub fn get_class(location: &str, symbol_name: &str) -> CoriumResult<SymbolValue> {
    RESOLVER.get_class(location, symbol_name)
}

/// Declare a relationship on `owner`, defined by `builder`.
pub fn register_relationship<F>(owner: Arc<dyn RelationshipHost>, name: impl Into<String>, builder: F)
where
    F: Fn() -> CoriumResult<RelationshipValue> + Send + Sync + 'static,
{
    RESOLVER.register_relationship(owner, name, builder);
}

/// Resolve one relationship by invoking its builder.
pub fn resolve_relationship(
    owner: &dyn RelationshipHost,
    name: &str,
) -> CoriumResult<RelationshipValue> {
    RESOLVER.resolve_relationship(owner, name)
}

/// Resolve and assign every registered relationship, tolerating per-item
/// failures.
pub fn resolve_lazy_relationships() -> SweepReport {
    RESOLVER.resolve_lazy_relationships()
}

/// Snapshot of everything registered but not yet resolved.
pub fn diagnostics() -> ResolverDiagnostics {
    RESOLVER.diagnostics()
}

/// Drop all process-wide state. Test isolation only.
pub fn reset() {
    RESOLVER.reset();
}

/// Drop all registered relationships, leaving imports and modules intact.
pub fn clear_relationship_caches() {
    RESOLVER.clear_relationship_caches();
}

/// Builder producing a single-target reference to the entity registered under
/// the lazy-import `name`, against the process-wide resolver.
pub fn reference_to(
    name: &str,
) -> impl Fn() -> CoriumResult<RelationshipValue> + Send + Sync + use<> {
    crate::resolver::reference_to(&RESOLVER, name)
}

/// Builder producing a collection reference to the entity registered under the
/// lazy-import `name`, against the process-wide resolver.
pub fn collection_of(
    name: &str,
) -> impl Fn() -> CoriumResult<RelationshipValue> + Send + Sync + use<> {
    crate::resolver::collection_of(&RESOLVER, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityDescriptor, as_entity};

    // One test only: the state below is process-wide, and in-module tests run
    // in parallel threads of the same binary.
    #[test]
    fn process_wide_lifecycle() {
        reset();

        let order = EntityDescriptor::new("models.order", "Order");
        let exported = order.clone();
        register_module("models.order", move || {
            Ok(Module::new("models.order").export_entity(&exported))
        });
        let item = EntityDescriptor::new("models.order_item", "OrderItem");
        let exported = item.clone();
        register_module("models.order_item", move || {
            Ok(Module::new("models.order_item").export_entity(&exported))
        });

        register_lazy_import("Order", "models.order", "Order");
        register_relationship(order.clone(), "items", collection_of("OrderItem"));

        // The relationship target is registered after the relationship itself.
        register_lazy_import("OrderItem", "models.order_item", "OrderItem");

        let resolved = as_entity(&resolve_lazy_import("Order").unwrap()).unwrap();
        assert!(Arc::ptr_eq(&resolved, &order));

        let report = resolve_lazy_relationships();
        assert!(report.is_clean());
        assert!(order.relationship("items").unwrap().is_collection());
        assert!(diagnostics().is_clean());

        reset();
        assert!(resolve_lazy_import("Order").is_err());
        assert!(resolve_relationship(order.as_ref(), "items").is_err());
    }
}
