//! Entity Component System
//!
//! Entities carry two kinds of components:
//! - [`Attribute`]s: data, at most one per Rust type
//! - [`Behaviour`]s: ordered logic updated once per tick
//!
//! [`System`]s operate on whole scenes after every behaviour has run.

pub mod attribute;
pub mod behaviour;
pub mod component;
pub mod components;
pub mod entity;
pub mod query;
pub mod registry;
pub mod system;

#[cfg(test)]
mod tests;

pub use attribute::{Attribute, AttributeTable};
pub use behaviour::{Behaviour, BehaviourList};
pub use component::ComponentRegistry;
pub use entity::{EntityHandle, EntityId};
pub use query::EntitySet;
pub use registry::EntityRegistry;
pub use system::{System, SystemList};
