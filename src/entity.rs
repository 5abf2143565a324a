//! Entity descriptors and owner identity.
//!
//! An [`EntityDescriptor`] is what an entity module exports: the stable identity
//! of an entity type (defining location + name) plus the relationship slots that
//! get filled in by the resolution sweep. Relationship assignment goes through an
//! explicit setter on the [`RelationshipHost`] trait, never through reflection.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;

/// A type-erased resolved symbol.
///
/// Modules export values of any `Send + Sync` type; entity descriptors are the
/// common case and can be recovered with [`as_entity`].
pub type SymbolValue = Arc<dyn Any + Send + Sync>;

/// Downcast a resolved symbol back to an entity descriptor.
pub fn as_entity(value: &SymbolValue) -> Option<Arc<EntityDescriptor>> {
    value.clone().downcast::<EntityDescriptor>().ok()
}

/// An owner of named relationships.
///
/// The relationship registry keys entries by identity data from this trait, not
/// by object identity, so registering against a re-created descriptor lands on
/// the same key. [`EntityDescriptor`] is the canonical implementor.
pub trait RelationshipHost: Send + Sync {
    /// Location of the module that defines this entity.
    fn defining_location(&self) -> &str;

    /// The entity's own name within its defining module.
    fn entity_name(&self) -> &str;

    /// Store a resolved relationship value under `name`.
    ///
    /// Called by the resolution sweep; overwrites any previous value.
    fn assign_relationship(&self, name: &str, value: RelationshipValue);
}

/// Stable identity of a relationship owner.
///
/// Derived from defining location plus entity name, so two entity types never
/// collide even when a relationship name repeats across them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerKey {
    pub location: String,
    pub name: String,
}

impl OwnerKey {
    /// Compute the key for a host from its identity data.
    pub fn of(host: &dyn RelationshipHost) -> Self {
        Self {
            location: host.defining_location().to_string(),
            name: host.entity_name().to_string(),
        }
    }
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.location, self.name)
    }
}

/// A resolved relationship value: a reference descriptor pointing at a target
/// entity, either single-valued or collection-valued.
#[derive(Clone)]
pub enum RelationshipValue {
    /// Single-target reference (e.g. `supplier`).
    One(Arc<EntityDescriptor>),
    /// Collection reference (e.g. `items`).
    Many(Arc<EntityDescriptor>),
}

impl RelationshipValue {
    /// The entity this reference points at.
    pub fn target(&self) -> &Arc<EntityDescriptor> {
        match self {
            RelationshipValue::One(target) | RelationshipValue::Many(target) => target,
        }
    }

    /// Whether this reference is collection-valued.
    pub fn is_collection(&self) -> bool {
        matches!(self, RelationshipValue::Many(_))
    }
}

impl std::fmt::Debug for RelationshipValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationshipValue::One(t) => write!(f, "One({}.{})", t.location(), t.name()),
            RelationshipValue::Many(t) => write!(f, "Many({}.{})", t.location(), t.name()),
        }
    }
}

/// Descriptor for an entity type.
///
/// Entity modules create one per entity and export it from their module
/// initializer. The relationship slots start empty and are filled by
/// [`assign_relationship`](RelationshipHost::assign_relationship) during the
/// resolution sweep (or lazily by the caller).
pub struct EntityDescriptor {
    location: String,
    name: String,
    relationships: DashMap<String, RelationshipValue>,
}

impl EntityDescriptor {
    /// Create a descriptor for an entity defined at `location` under `name`.
    pub fn new(location: impl Into<String>, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            location: location.into(),
            name: name.into(),
            relationships: DashMap::new(),
        })
    }

    /// The defining module location.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an assigned relationship value.
    pub fn relationship(&self, name: &str) -> Option<RelationshipValue> {
        self.relationships.get(name).map(|r| r.value().clone())
    }

    /// Names of all currently assigned relationships.
    pub fn relationship_names(&self) -> Vec<String> {
        self.relationships.iter().map(|r| r.key().clone()).collect()
    }
}

impl RelationshipHost for EntityDescriptor {
    fn defining_location(&self) -> &str {
        &self.location
    }

    fn entity_name(&self) -> &str {
        &self.name
    }

    fn assign_relationship(&self, name: &str, value: RelationshipValue) {
        self.relationships.insert(name.to_string(), value);
    }
}

impl std::fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("location", &self.location)
            .field("name", &self.name)
            .field("relationships", &self.relationships.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_keys_distinguish_locations() {
        let order = EntityDescriptor::new("models.order", "Order");
        let archived = EntityDescriptor::new("models.archive", "Order");

        let a = OwnerKey::of(order.as_ref());
        let b = OwnerKey::of(archived.as_ref());
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "models.order.Order");
    }

    #[test]
    fn owner_key_is_identity_data_not_object_identity() {
        let first = EntityDescriptor::new("models.order", "Order");
        let second = EntityDescriptor::new("models.order", "Order");
        assert_eq!(OwnerKey::of(first.as_ref()), OwnerKey::of(second.as_ref()));
    }

    #[test]
    fn assignment_goes_through_the_setter() {
        let order = EntityDescriptor::new("models.order", "Order");
        let item = EntityDescriptor::new("models.order_item", "OrderItem");

        assert!(order.relationship("items").is_none());
        order.assign_relationship("items", RelationshipValue::Many(item.clone()));

        let value = order.relationship("items").unwrap();
        assert!(value.is_collection());
        assert_eq!(value.target().name(), "OrderItem");
    }

    #[test]
    fn reassignment_overwrites_the_slot() {
        let order = EntityDescriptor::new("models.order", "Order");
        let item = EntityDescriptor::new("models.order_item", "OrderItem");

        order.assign_relationship("items", RelationshipValue::One(item.clone()));
        order.assign_relationship("items", RelationshipValue::Many(item));
        assert!(order.relationship("items").unwrap().is_collection());
        assert_eq!(order.relationship_names(), vec!["items".to_string()]);
    }

    #[test]
    fn as_entity_round_trips_through_symbol_value() {
        let order = EntityDescriptor::new("models.order", "Order");
        let value: SymbolValue = order.clone();

        let back = as_entity(&value).unwrap();
        assert!(Arc::ptr_eq(&order, &back));

        let not_entity: SymbolValue = Arc::new(42usize);
        assert!(as_entity(&not_entity).is_none());
    }
}
