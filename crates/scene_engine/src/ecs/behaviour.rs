//! Behaviour trait and the ordered per-entity behaviour list

use super::EntityHandle;
use crate::error::{EcsError, EcsResult};
use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Logic component updated once per tick in attachment order
pub trait Behaviour: Any {
    /// Called once, synchronously, when the behaviour is added to `owner`
    fn create(&mut self, _owner: &EntityHandle) -> EcsResult<()> {
        Ok(())
    }

    /// Advance by `delta_time` seconds
    fn update(&mut self, owner: &EntityHandle, delta_time: f32) -> EcsResult<()>;

    /// Called once when the behaviour is removed or its entity released
    fn destroy(&mut self, _owner: &EntityHandle) {}
}

pub(crate) struct BehaviourSlot {
    pub(crate) type_id: TypeId,
    pub(crate) label: String,
    pub(crate) name: Option<String>,
    typed: Rc<dyn Any>,
    pub(crate) shared: Rc<RefCell<dyn Behaviour>>,
    attached: Cell<bool>,
}

impl BehaviourSlot {
    pub(crate) fn new<T: Behaviour>(value: T, name: Option<String>) -> Self {
        Self::wrap(value, name).0
    }

    pub(crate) fn wrap<T: Behaviour>(value: T, name: Option<String>) -> (Self, Rc<RefCell<T>>) {
        let cell = Rc::new(RefCell::new(value));
        let typed: Rc<dyn Any> = Rc::clone(&cell) as Rc<dyn Any>;
        let shared: Rc<RefCell<dyn Behaviour>> = Rc::clone(&cell) as Rc<RefCell<dyn Behaviour>>;
        let slot = Self {
            type_id: TypeId::of::<T>(),
            label: name.clone().unwrap_or_else(|| type_name::<T>().to_string()),
            name,
            typed,
            shared,
            attached: Cell::new(true),
        };
        (slot, cell)
    }

    pub(crate) fn downcast<T: Behaviour>(&self) -> Option<Rc<RefCell<T>>> {
        Rc::clone(&self.typed).downcast::<RefCell<T>>().ok()
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub(crate) fn detach(&self) {
        self.attached.set(false);
    }

    pub(crate) fn run_destroy(&self, owner: &EntityHandle) {
        match self.shared.try_borrow_mut() {
            Ok(mut behaviour) => behaviour.destroy(owner),
            Err(_) => log::warn!("Behaviour '{}' is busy; skipping its destroy hook", self.label),
        }
    }
}

/// Ordered behaviours of one entity
///
/// Duplicates of the same type are allowed; typed lookups return the first.
#[derive(Default)]
pub struct BehaviourList {
    slots: Vec<Rc<BehaviourSlot>>,
}

impl BehaviourList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, slot: Rc<BehaviourSlot>) {
        self.slots.push(slot);
    }

    /// First behaviour of type `T`
    pub fn get<T: Behaviour>(&self) -> EcsResult<Rc<RefCell<T>>> {
        self.slots
            .iter()
            .find(|slot| slot.type_id == TypeId::of::<T>())
            .and_then(|slot| slot.downcast::<T>())
            .ok_or_else(|| EcsError::not_found("behaviour", type_name::<T>()))
    }

    /// First behaviour registered under `name`
    pub fn get_by_name(&self, name: &str) -> EcsResult<Rc<RefCell<dyn Behaviour>>> {
        self.slots
            .iter()
            .find(|slot| slot.name.as_deref() == Some(name))
            .map(|slot| Rc::clone(&slot.shared))
            .ok_or_else(|| EcsError::not_found("behaviour", name))
    }

    /// Whether at least one behaviour of type `T` is attached
    pub fn contains<T: Behaviour>(&self) -> bool {
        self.slots.iter().any(|slot| slot.type_id == TypeId::of::<T>())
    }

    /// Number of attached behaviours
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no behaviour is attached
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Detach the first behaviour of type `type_id`
    pub(crate) fn remove_type(&mut self, type_id: TypeId) -> Option<Rc<BehaviourSlot>> {
        let index = self.slots.iter().position(|slot| slot.type_id == type_id)?;
        let slot = self.slots.remove(index);
        slot.detach();
        Some(slot)
    }

    pub(crate) fn snapshot(&self) -> Vec<Rc<BehaviourSlot>> {
        self.slots.clone()
    }

    pub(crate) fn drain(&mut self) -> Vec<Rc<BehaviourSlot>> {
        let slots = std::mem::take(&mut self.slots);
        for slot in &slots {
            slot.detach();
        }
        slots
    }
}

/// Update every slot of a snapshot, returning how many failed
///
/// Behaviours detached during the pass are skipped. The pass keeps going if
/// the owner dies part way through, so later behaviours still see this tick.
pub(crate) fn update_all(slots: &[Rc<BehaviourSlot>], owner: &EntityHandle, delta_time: f32) -> usize {
    let mut failures = 0;
    for slot in slots {
        if !slot.is_attached() {
            continue;
        }
        let result = match slot.shared.try_borrow_mut() {
            Ok(mut behaviour) => behaviour.update(owner, delta_time),
            Err(_) => Err(EcsError::busy(&slot.label)),
        };
        if let Err(err) = result {
            log::error!("Behaviour '{}' failed to update: {}", slot.label, err);
            failures += 1;
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        ticks: u32,
        elapsed: f32,
    }

    impl Behaviour for Counter {
        fn update(&mut self, _owner: &EntityHandle, delta_time: f32) -> EcsResult<()> {
            self.ticks += 1;
            self.elapsed += delta_time;
            Ok(())
        }
    }

    struct Failing;

    impl Behaviour for Failing {
        fn update(&mut self, _owner: &EntityHandle, _delta_time: f32) -> EcsResult<()> {
            Err(EcsError::Custom("boom".to_string()))
        }
    }

    fn counter() -> Counter {
        Counter { ticks: 0, elapsed: 0.0 }
    }

    #[test]
    fn test_get_returns_first_of_type() {
        let mut list = BehaviourList::new();
        let (first, first_typed) = BehaviourSlot::wrap(counter(), None);
        list.push(Rc::new(first));
        list.push(Rc::new(BehaviourSlot::new(counter(), None)));

        first_typed.borrow_mut().ticks = 7;
        assert_eq!(list.len(), 2);
        assert_eq!(list.get::<Counter>().unwrap().borrow().ticks, 7);
        assert!(matches!(list.get::<Failing>(), Err(EcsError::NotFound { .. })));
    }

    #[test]
    fn test_update_all_counts_failures_and_continues() {
        let mut list = BehaviourList::new();
        list.push(Rc::new(BehaviourSlot::new(Failing, None)));
        let (slot, typed) = BehaviourSlot::wrap(counter(), Some("Counter".to_string()));
        list.push(Rc::new(slot));

        let failures = update_all(&list.snapshot(), &EntityHandle::dangling(), 0.5);

        assert_eq!(failures, 1);
        assert_eq!(typed.borrow().ticks, 1);
        approx::assert_relative_eq!(typed.borrow().elapsed, 0.5);
    }

    #[test]
    fn test_detached_slot_skipped_by_running_snapshot() {
        let mut list = BehaviourList::new();
        let (slot, typed) = BehaviourSlot::wrap(counter(), None);
        list.push(Rc::new(slot));

        let snapshot = list.snapshot();
        assert!(list.remove_type(TypeId::of::<Counter>()).is_some());
        update_all(&snapshot, &EntityHandle::dangling(), 1.0);

        assert_eq!(typed.borrow().ticks, 0);
        assert!(list.is_empty());
    }

    #[test]
    fn test_lookup_by_name() {
        let mut list = BehaviourList::new();
        list.push(Rc::new(BehaviourSlot::new(counter(), Some("Counter".to_string()))));

        assert!(list.get_by_name("Counter").is_ok());
        assert!(list.get_by_name("Timer").is_err());
    }
}
