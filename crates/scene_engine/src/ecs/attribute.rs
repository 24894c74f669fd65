//! Attribute trait and per-entity attribute storage
//!
//! Attributes are data components. An entity holds at most one attribute of
//! a given Rust type; inserting another replaces it. Every attribute can be
//! reached by its type and, when its type was registered with a name in the
//! [`ComponentRegistry`](super::ComponentRegistry), by that name. Both paths
//! resolve to the same `Rc<RefCell<_>>` allocation.

use super::EntityHandle;
use crate::error::{EcsError, EcsResult};
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Data component attached to an entity
pub trait Attribute: Any {
    /// Called once when the attribute is attached to `owner`
    ///
    /// Attributes that need to call back into their entity (for example to
    /// destroy it) keep a clone of `owner`.
    fn create(&mut self, _owner: &EntityHandle) -> EcsResult<()> {
        Ok(())
    }

    /// Called once when the attribute is replaced, removed or its entity released
    fn destroy(&mut self, _owner: &EntityHandle) {}
}

/// One stored attribute, reachable both typed and as a trait object
pub(crate) struct AttributeSlot {
    pub(crate) type_id: TypeId,
    pub(crate) label: String,
    pub(crate) name: Option<String>,
    typed: Rc<dyn Any>,
    pub(crate) shared: Rc<RefCell<dyn Attribute>>,
}

impl AttributeSlot {
    pub(crate) fn new<T: Attribute>(value: T, name: Option<String>) -> Self {
        Self::wrap(value, name).0
    }

    /// Build a slot and also hand back the typed cell
    pub(crate) fn wrap<T: Attribute>(value: T, name: Option<String>) -> (Self, Rc<RefCell<T>>) {
        let cell = Rc::new(RefCell::new(value));
        let typed: Rc<dyn Any> = Rc::clone(&cell) as Rc<dyn Any>;
        let shared: Rc<RefCell<dyn Attribute>> = Rc::clone(&cell) as Rc<RefCell<dyn Attribute>>;
        let label = name.clone().unwrap_or_else(|| type_name::<T>().to_string());
        let slot = Self {
            type_id: TypeId::of::<T>(),
            label,
            name,
            typed,
            shared,
        };
        (slot, cell)
    }

    pub(crate) fn downcast<T: Attribute>(&self) -> Option<Rc<RefCell<T>>> {
        Rc::clone(&self.typed).downcast::<RefCell<T>>().ok()
    }

    pub(crate) fn run_destroy(&self, owner: &EntityHandle) {
        match self.shared.try_borrow_mut() {
            Ok(mut attribute) => attribute.destroy(owner),
            Err(_) => log::warn!("Attribute '{}' is busy; skipping its destroy hook", self.label),
        }
    }
}

/// Heterogeneous attribute storage of one entity
///
/// A single map from type tag to instance plus a name index that is filled
/// from the registered component names at insertion time.
#[derive(Default)]
pub struct AttributeTable {
    slots: HashMap<TypeId, AttributeSlot>,
    order: Vec<TypeId>,
    names: HashMap<String, TypeId>,
}

impl AttributeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace the attribute of type `T`
    ///
    /// Lifecycle hooks are not run; attach through
    /// [`EntityHandle::set_attribute`] for that.
    pub fn set<T: Attribute>(&mut self, value: T, name: Option<String>) -> Rc<RefCell<T>> {
        let (slot, typed) = AttributeSlot::wrap(value, name);
        self.insert(slot);
        typed
    }

    /// Insert a slot, returning the one it replaced
    pub(crate) fn insert(&mut self, slot: AttributeSlot) -> Option<AttributeSlot> {
        let type_id = slot.type_id;
        if let Some(name) = &slot.name {
            self.names.insert(name.clone(), type_id);
        }
        let replaced = self.slots.insert(type_id, slot);
        match &replaced {
            Some(old) => {
                if let Some(old_name) = &old.name {
                    let still_named = self.slots.get(&type_id).and_then(|s| s.name.as_ref()) == Some(old_name);
                    if !still_named {
                        self.names.remove(old_name);
                    }
                }
            }
            None => self.order.push(type_id),
        }
        replaced
    }

    /// Typed lookup
    pub fn get<T: Attribute>(&self) -> EcsResult<Rc<RefCell<T>>> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(AttributeSlot::downcast::<T>)
            .ok_or_else(|| EcsError::not_found("attribute", type_name::<T>()))
    }

    /// Name lookup, resolving to the same instance as [`get`](Self::get)
    pub fn get_by_name(&self, name: &str) -> EcsResult<Rc<RefCell<dyn Attribute>>> {
        self.slot_by_name(name).map(|slot| Rc::clone(&slot.shared))
    }

    /// Name lookup that also checks the stored type
    pub fn get_by_name_as<T: Attribute>(&self, name: &str) -> EcsResult<Rc<RefCell<T>>> {
        self.slot_by_name(name)?
            .downcast::<T>()
            .ok_or_else(|| EcsError::not_found("attribute", format!("{name} as {}", type_name::<T>())))
    }

    fn slot_by_name(&self, name: &str) -> EcsResult<&AttributeSlot> {
        self.names
            .get(name)
            .and_then(|type_id| self.slots.get(type_id))
            .ok_or_else(|| EcsError::not_found("attribute", name))
    }

    /// Whether an attribute of type `T` is present
    pub fn contains<T: Attribute>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<T>())
    }

    /// Whether an attribute is registered under `name`
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Remove the attribute of type `T`; absent attributes are a no-op
    pub fn remove<T: Attribute>(&mut self) -> bool {
        self.remove_type(TypeId::of::<T>()).is_some()
    }

    pub(crate) fn remove_type(&mut self, type_id: TypeId) -> Option<AttributeSlot> {
        let slot = self.slots.remove(&type_id)?;
        self.order.retain(|id| *id != type_id);
        if let Some(name) = &slot.name {
            self.names.remove(name);
        }
        Some(slot)
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table holds no attributes
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Registered names of the stored attributes, in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|type_id| self.slots.get(type_id))
            .filter_map(|slot| slot.name.as_deref())
            .collect()
    }

    /// Remove everything, in insertion order
    pub(crate) fn drain(&mut self) -> Vec<AttributeSlot> {
        self.names.clear();
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|type_id| self.slots.remove(&type_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Armor(u32);
    impl Attribute for Armor {}

    #[derive(Debug)]
    struct Tag(&'static str);
    impl Attribute for Tag {}

    #[test]
    fn test_set_then_get_returns_value() {
        let mut table = AttributeTable::new();
        table.set(Armor(5), None);
        assert_eq!(*table.get::<Armor>().unwrap().borrow(), Armor(5));
    }

    #[test]
    fn test_set_replaces_instead_of_adding() {
        let mut table = AttributeTable::new();
        table.set(Armor(1), Some("Armor".to_string()));
        table.set(Armor(2), Some("Armor".to_string()));

        assert_eq!(table.len(), 1);
        assert_eq!(table.get::<Armor>().unwrap().borrow().0, 2);
        assert_eq!(table.names(), vec!["Armor"]);
    }

    #[test]
    fn test_name_and_type_share_one_instance() {
        let mut table = AttributeTable::new();
        let typed = table.set(Armor(3), Some("Armor".to_string()));

        let by_name = table.get_by_name("Armor").unwrap();
        assert_eq!(Rc::as_ptr(&by_name).cast::<()>(), Rc::as_ptr(&typed).cast::<()>());

        typed.borrow_mut().0 = 9;
        assert_eq!(table.get_by_name_as::<Armor>("Armor").unwrap().borrow().0, 9);
    }

    #[test]
    fn test_missing_lookups_fail_with_not_found() {
        let mut table = AttributeTable::new();
        table.set(Tag("unnamed"), None);

        assert!(matches!(table.get::<Armor>(), Err(EcsError::NotFound { .. })));
        assert!(matches!(table.get_by_name("Tag"), Err(EcsError::NotFound { .. })));
        assert!(table.get_by_name_as::<Armor>("Tag").is_err());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut table = AttributeTable::new();
        table.set(Armor(1), Some("Armor".to_string()));

        assert!(table.remove::<Armor>());
        assert!(!table.remove::<Armor>());
        assert!(!table.contains_name("Armor"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_drain_keeps_insertion_order() {
        let mut table = AttributeTable::new();
        table.set(Tag("first"), Some("Tag".to_string()));
        table.set(Armor(1), Some("Armor".to_string()));

        let labels: Vec<String> = table.drain().into_iter().map(|slot| slot.label).collect();
        assert_eq!(labels, vec!["Tag".to_string(), "Armor".to_string()]);
        assert!(table.is_empty());
    }
}
