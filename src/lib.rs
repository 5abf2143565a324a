//! # corium
//!
//! Deferred symbol and relationship resolution for entity model graphs:
//! entity modules reference each other by name before both sides exist, and
//! inter-entity relationships declared in any order are bound later, lazily on
//! first use or eagerly in one startup sweep.
//!
//! ## Architecture
//!
//! - **Module loader** (`module`): location → initializer indirection table
//!   with a loaded-module cache
//! - **Lazy imports** (`imports`): logical name → deferred symbol reference,
//!   resolved and cached on first use
//! - **Relationships** (`relationship`): `(owner, name)` → builder callback,
//!   resolved per pair or in one failure-tolerant sweep
//! - **Resolver facade** (`resolver`): owns all three, plus startup diagnostics
//! - **Process-wide API** (`global`): the explicit singleton entity modules
//!   register against
//!
//! ## Library usage
//!
//! ```no_run
//! use corium::entity::{EntityDescriptor, as_entity};
//! use corium::global::{self, collection_of};
//! use corium::module::Module;
//!
//! // Entity modules declare themselves, in any order.
//! let order = EntityDescriptor::new("models.order", "Order");
//! let exported = order.clone();
//! global::register_module("models.order", move || {
//!     Ok(Module::new("models.order").export_entity(&exported))
//! });
//! global::register_lazy_import("Order", "models.order", "Order");
//! global::register_relationship(order.clone(), "items", collection_of("OrderItem"));
//!
//! let item = EntityDescriptor::new("models.order_item", "OrderItem");
//! let exported = item.clone();
//! global::register_module("models.order_item", move || {
//!     Ok(Module::new("models.order_item").export_entity(&exported))
//! });
//! global::register_lazy_import("OrderItem", "models.order_item", "OrderItem");
//!
//! // Startup: bind everything in one sweep.
//! let report = global::resolve_lazy_relationships();
//! assert!(report.is_clean());
//! assert!(order.relationship("items").unwrap().is_collection());
//! ```

pub mod entity;
pub mod error;
pub mod global;
pub mod imports;
pub mod module;
pub mod relationship;
pub mod resolver;
