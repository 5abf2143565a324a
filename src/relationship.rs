//! Relationship registry: deferred links between entities.
//!
//! Entity A declares a relationship to entity B through a zero-argument builder
//! callback, before B exists. Builders run only at resolution time: one pair on
//! demand via [`resolve`](RelationshipRegistry::resolve), or every pair in
//! registration order via [`resolve_all`](RelationshipRegistry::resolve_all),
//! which assigns each produced value onto its owner and tolerates per-item
//! failures so one bad relationship cannot block the rest from initializing.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::entity::{OwnerKey, RelationshipHost, RelationshipValue};
use crate::error::{CoriumError, CoriumResult, RelationshipError};

/// Zero-argument callback producing a relationship value.
pub type RelationshipBuilder = Arc<dyn Fn() -> CoriumResult<RelationshipValue> + Send + Sync>;

/// Unique key of a registered relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationshipKey {
    pub owner: OwnerKey,
    pub relationship: String,
}

impl std::fmt::Display for RelationshipKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.owner, self.relationship)
    }
}

struct RelationshipEntry {
    owner: Arc<dyn RelationshipHost>,
    builder: RelationshipBuilder,
    resolved: bool,
}

/// One failed pair from a resolution sweep.
#[derive(Debug)]
pub struct SweepFailure {
    pub key: RelationshipKey,
    pub error: CoriumError,
}

/// Outcome of a full resolution sweep.
///
/// The sweep itself never fails; every pair lands in exactly one of the two
/// lists, in registration order.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub assigned: Vec<RelationshipKey>,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    /// Whether every registered relationship resolved and was assigned.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry of deferred relationships, keyed by `(owner key, name)`.
pub struct RelationshipRegistry {
    entries: DashMap<RelationshipKey, RelationshipEntry>,
    /// First-registration order, so the sweep is deterministic.
    order: Mutex<Vec<RelationshipKey>>,
}

impl RelationshipRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(Vec::new()),
        }
    }

    /// Register (or overwrite) a relationship on `owner`.
    ///
    /// Overwriting replaces the builder only; a previously resolved state and
    /// anything already assigned on the owner stay put. The key derives from
    /// the owner's identity data, so repeated registration across re-created
    /// descriptors lands on the same entry.
    pub fn register<F>(&self, owner: Arc<dyn RelationshipHost>, name: impl Into<String>, builder: F)
    where
        F: Fn() -> CoriumResult<RelationshipValue> + Send + Sync + 'static,
    {
        let key = RelationshipKey {
            owner: OwnerKey::of(owner.as_ref()),
            relationship: name.into(),
        };
        tracing::trace!(key = %key, "registered relationship");

        let first_registration = match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.owner = owner;
                entry.builder = Arc::new(builder);
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(RelationshipEntry {
                    owner,
                    builder: Arc::new(builder),
                    resolved: false,
                });
                true
            }
        };

        // Recorded outside the map guard; only the first registration counts
        // toward sweep order.
        if first_registration {
            self.order
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(key);
        }
    }

    /// Resolve one relationship by invoking its builder.
    ///
    /// Builder failures propagate unwrapped. The registry memoizes nothing;
    /// calling this repeatedly re-invokes the builder each time.
    pub fn resolve(
        &self,
        owner: &dyn RelationshipHost,
        name: &str,
    ) -> CoriumResult<RelationshipValue> {
        let key = RelationshipKey {
            owner: OwnerKey::of(owner),
            relationship: name.to_string(),
        };
        let builder = self
            .entries
            .get(&key)
            .map(|entry| entry.builder.clone())
            .ok_or_else(|| RelationshipError::Unknown {
                owner: key.owner.to_string(),
                relationship: name.to_string(),
            })?;

        let value = builder()?;
        if let Some(mut entry) = self.entries.get_mut(&key) {
            entry.resolved = true;
        }
        Ok(value)
    }

    /// Resolve every registered relationship in registration order, assigning
    /// each produced value onto its owner.
    ///
    /// Each pair is independent: a failure is logged and recorded, and the
    /// sweep continues with the next pair.
    pub fn resolve_all(&self) -> SweepReport {
        let keys = self
            .order
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        let mut report = SweepReport::default();
        for key in keys {
            // Entries can disappear under a concurrent clear; skip them.
            let Some((owner, builder)) = self
                .entries
                .get(&key)
                .map(|entry| (entry.owner.clone(), entry.builder.clone()))
            else {
                continue;
            };

            match builder() {
                Ok(value) => {
                    owner.assign_relationship(&key.relationship, value);
                    if let Some(mut entry) = self.entries.get_mut(&key) {
                        entry.resolved = true;
                    }
                    report.assigned.push(key);
                }
                Err(error) => {
                    tracing::warn!(key = %key, %error, "relationship resolution failed");
                    report.failures.push(SweepFailure { key, error });
                }
            }
        }

        tracing::info!(
            assigned = report.assigned.len(),
            failed = report.failures.len(),
            "relationship sweep complete"
        );
        report
    }

    /// Keys registered but never successfully resolved, in registration order.
    pub fn pending(&self) -> Vec<RelationshipKey> {
        let keys = self
            .order
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        keys.into_iter()
            .filter(|key| {
                self.entries
                    .get(key)
                    .is_some_and(|entry| !entry.resolved)
            })
            .collect()
    }

    /// Number of registered relationships.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all registered entries.
    pub fn clear(&self) {
        self.entries.clear();
        self.order
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Default for RelationshipRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RelationshipRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}
