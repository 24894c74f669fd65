//! Scene-wide systems and their processing order

use super::{EntityHandle, EntitySet};
use crate::error::{EcsError, EcsResult};
use crate::scene::SceneRef;
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

/// Scene-wide processor invoked once per tick after all behaviours
pub trait System: Any {
    /// Called once when the system is added to `scene`
    fn create(&mut self, _scene: &SceneRef) -> EcsResult<()> {
        Ok(())
    }

    /// Whether `entity` belongs in this system's view for the coming tick
    ///
    /// Evaluated against the entity snapshot taken at tick start.
    fn matches(&self, entity: &EntityHandle) -> bool {
        entity.alive()
    }

    /// Process the entities selected by [`matches`](Self::matches)
    fn process(&mut self, scene: &SceneRef, entities: &EntitySet, delta_time: f32) -> EcsResult<()>;

    /// Called once when the scene is destroyed
    fn destroy(&mut self, _scene: &SceneRef) {}
}

pub(crate) struct SystemSlot {
    pub(crate) name: String,
    type_id: TypeId,
    typed: Rc<dyn Any>,
    pub(crate) shared: Rc<RefCell<dyn System>>,
}

impl SystemSlot {
    pub(crate) fn new<T: System>(value: T, name: Option<String>) -> Self {
        Self::wrap(value, name).0
    }

    pub(crate) fn wrap<T: System>(value: T, name: Option<String>) -> (Self, Rc<RefCell<T>>) {
        let cell = Rc::new(RefCell::new(value));
        let typed: Rc<dyn Any> = Rc::clone(&cell) as Rc<dyn Any>;
        let shared: Rc<RefCell<dyn System>> = Rc::clone(&cell) as Rc<RefCell<dyn System>>;
        let slot = Self {
            name: name.unwrap_or_else(|| type_name::<T>().to_string()),
            type_id: TypeId::of::<T>(),
            typed,
            shared,
        };
        (slot, cell)
    }

    fn downcast<T: System>(&self) -> Option<Rc<RefCell<T>>> {
        Rc::clone(&self.typed).downcast::<RefCell<T>>().ok()
    }

    pub(crate) fn run_destroy(&self, scene: &SceneRef) {
        match self.shared.try_borrow_mut() {
            Ok(mut system) => system.destroy(scene),
            Err(_) => log::warn!("System '{}' is busy; skipping its destroy hook", self.name),
        }
    }
}

/// Systems of one scene, kept in insertion order
#[derive(Default)]
pub struct SystemList {
    slots: Vec<Rc<SystemSlot>>,
}

impl SystemList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a system; names are unique within a scene
    pub(crate) fn insert(&mut self, slot: Rc<SystemSlot>) -> EcsResult<()> {
        if self.slots.iter().any(|existing| existing.name == slot.name) {
            return Err(EcsError::duplicate("system", slot.name.clone()));
        }
        self.slots.push(slot);
        Ok(())
    }

    pub(crate) fn remove_slot(&mut self, slot: &Rc<SystemSlot>) {
        self.slots.retain(|existing| !Rc::ptr_eq(existing, slot));
    }

    /// First system of type `T`
    pub fn get<T: System>(&self) -> EcsResult<Rc<RefCell<T>>> {
        self.slots
            .iter()
            .find(|slot| slot.type_id == TypeId::of::<T>())
            .and_then(|slot| slot.downcast::<T>())
            .ok_or_else(|| EcsError::not_found("system", type_name::<T>()))
    }

    /// System added under `name`
    pub fn get_by_name(&self, name: &str) -> EcsResult<Rc<RefCell<dyn System>>> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| Rc::clone(&slot.shared))
            .ok_or_else(|| EcsError::not_found("system", name))
    }

    /// System names in processing order
    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.name.as_str()).collect()
    }

    /// Number of systems
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the scene has no systems
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<Rc<SystemSlot>> {
        self.slots.clone()
    }

    pub(crate) fn drain(&mut self) -> Vec<Rc<SystemSlot>> {
        std::mem::take(&mut self.slots)
    }
}

/// A system paired with the entities it will process this tick
pub(crate) struct SystemView {
    slot: Rc<SystemSlot>,
    entities: EntitySet,
}

/// Evaluate every system's predicate against the tick-start snapshot
pub(crate) fn prepare_views(slots: Vec<Rc<SystemSlot>>, snapshot: &EntitySet) -> Vec<SystemView> {
    slots
        .into_iter()
        .map(|slot| {
            let entities = match slot.shared.try_borrow() {
                Ok(system) => snapshot.filter(|entity| system.matches(entity)),
                Err(_) => {
                    log::warn!("System '{}' is busy; it sees no entities this tick", slot.name);
                    EntitySet::default()
                }
            };
            SystemView { slot, entities }
        })
        .collect()
}

/// Process each prepared view in order, returning how many systems failed
pub(crate) fn process_all(views: &[SystemView], scene: &SceneRef, delta_time: f32) -> usize {
    let mut failures = 0;
    for view in views {
        let result = match view.slot.shared.try_borrow_mut() {
            Ok(mut system) => system.process(scene, &view.entities, delta_time),
            Err(_) => Err(EcsError::busy(&view.slot.name)),
        };
        if let Err(err) = result {
            log::error!("System '{}' failed to process: {}", view.slot.name, err);
            failures += 1;
        }
    }
    failures
}
