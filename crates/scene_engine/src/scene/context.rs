//! Shared scene state and the weak handle components use to reach it

use crate::config::SceneConfig;
use crate::ecs::system::SystemSlot;
use crate::ecs::{ComponentRegistry, EntityHandle, EntityRegistry, EntitySet, System, SystemList};
use crate::error::{EcsError, EcsResult};
use crate::events::{Event, EventBus, SubscriptionToken};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// State owned by a live [`Scene`](super::Scene)
///
/// Only the scene holds a strong reference; every [`SceneRef`] is weak.
pub(crate) struct SceneShared {
    pub(crate) entities: RefCell<EntityRegistry>,
    pub(crate) systems: RefCell<SystemList>,
    pub(crate) events: EventBus,
    pub(crate) components: Rc<ComponentRegistry>,
    closing: Cell<bool>,
}

impl SceneShared {
    pub(crate) fn new(components: Rc<ComponentRegistry>, config: &SceneConfig) -> Self {
        Self {
            entities: RefCell::new(EntityRegistry::new(config.max_entities)),
            systems: RefCell::new(SystemList::new()),
            events: EventBus::new(),
            components,
            closing: Cell::new(false),
        }
    }

    /// Refuse new entities and systems from here on
    pub(crate) fn close(&self) {
        self.closing.set(true);
    }
}

/// Weak handle to a scene
///
/// Handed to systems, scene logic and anything that needs to reach the
/// scene from inside a tick. Every method fails with
/// [`EcsError::InvalidState`] once the scene has been destroyed.
#[derive(Clone)]
pub struct SceneRef {
    inner: Weak<SceneShared>,
}

impl SceneRef {
    pub(crate) fn new(inner: Weak<SceneShared>) -> Self {
        Self { inner }
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self { inner: Weak::new() }
    }

    pub(crate) fn upgrade(&self) -> EcsResult<Rc<SceneShared>> {
        self.inner.upgrade().ok_or_else(EcsError::scene_gone)
    }

    fn open(&self) -> EcsResult<Rc<SceneShared>> {
        let shared = self.upgrade()?;
        if shared.closing.get() {
            return Err(EcsError::InvalidState("scene is being destroyed".to_string()));
        }
        Ok(shared)
    }

    /// Whether the scene still exists
    pub fn is_valid(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Component catalog shared by the scene
    pub fn components(&self) -> EcsResult<Rc<ComponentRegistry>> {
        Ok(Rc::clone(&self.upgrade()?.components))
    }

    // -- Entities --

    /// Create a new live entity
    pub fn create_entity(&self, name: impl Into<String>) -> EcsResult<EntityHandle> {
        let shared = self.open()?;
        let mut entities = shared.entities.borrow_mut();
        entities.create(name.into(), self.inner.clone())
    }

    /// Snapshot of every entity in creation order, including those
    /// destroyed this tick but not yet purged
    pub fn entities(&self) -> EcsResult<EntitySet> {
        Ok(self.upgrade()?.entities.borrow().all())
    }

    /// Number of stored entities, pending removals included
    pub fn entity_count(&self) -> EcsResult<usize> {
        Ok(self.upgrade()?.entities.borrow().len())
    }

    /// First live entity called `name`
    pub fn find_entity(&self, name: &str) -> EcsResult<EntityHandle> {
        self.upgrade()?.entities.borrow().find_by_name(name)
    }

    /// Schedule `entity` for removal; same as [`EntityHandle::destroy`]
    pub fn destroy_entity(&self, entity: &EntityHandle) -> bool {
        entity.destroy()
    }

    /// Add `entity` to the named group
    pub fn add_to_group(&self, group: &str, entity: &EntityHandle) -> EcsResult<bool> {
        let shared = self.upgrade()?;
        let mut entities = shared.entities.borrow_mut();
        entities.add_to_group(group, entity)
    }

    /// Remove `entity` from the named group
    pub fn remove_from_group(&self, group: &str, entity: &EntityHandle) -> EcsResult<bool> {
        let shared = self.upgrade()?;
        let mut entities = shared.entities.borrow_mut();
        Ok(entities.remove_from_group(group, entity))
    }

    /// Members of the named group
    pub fn group(&self, group: &str) -> EcsResult<EntitySet> {
        Ok(self.upgrade()?.entities.borrow().group(group))
    }

    /// Groups `entity` belongs to
    pub fn groups_of(&self, entity: &EntityHandle) -> EcsResult<Vec<String>> {
        Ok(self.upgrade()?.entities.borrow().groups_of(entity))
    }

    // -- Systems --

    /// Add a system, running its `create` hook
    ///
    /// The system is named after its registered name, or its type name when
    /// unregistered; names are unique within a scene.
    pub fn add_system<T: System>(&self, system: T) -> EcsResult<Rc<RefCell<T>>> {
        let shared = self.open()?;
        let name = shared.components.system_name::<T>().map(str::to_string);
        let (slot, typed) = SystemSlot::wrap(system, name);
        self.attach_system(&shared, slot)?;
        Ok(typed)
    }

    /// Construct and add the system registered as `name`
    pub fn create_system(&self, name: &str) -> EcsResult<Rc<RefCell<dyn System>>> {
        let shared = self.open()?;
        let slot = shared.components.create_system(name)?;
        let system = Rc::clone(&slot.shared);
        self.attach_system(&shared, slot)?;
        Ok(system)
    }

    fn attach_system(&self, shared: &SceneShared, slot: SystemSlot) -> EcsResult<()> {
        let slot = Rc::new(slot);
        shared.systems.borrow_mut().insert(Rc::clone(&slot))?;

        let created = slot.shared.borrow_mut().create(self);
        if let Err(err) = created {
            shared.systems.borrow_mut().remove_slot(&slot);
            return Err(err);
        }
        log::debug!("Added system '{}'", slot.name);
        Ok(())
    }

    /// First system of type `T`
    pub fn system<T: System>(&self) -> EcsResult<Rc<RefCell<T>>> {
        self.upgrade()?.systems.borrow().get::<T>()
    }

    /// System added under `name`
    pub fn system_by_name(&self, name: &str) -> EcsResult<Rc<RefCell<dyn System>>> {
        self.upgrade()?.systems.borrow().get_by_name(name)
    }

    /// Number of systems
    pub fn system_count(&self) -> EcsResult<usize> {
        Ok(self.upgrade()?.systems.borrow().len())
    }

    // -- Events --

    /// Subscribe to `E` on the scene bus
    pub fn subscribe<E: Event>(&self, handler: impl Fn(&E) + 'static) -> EcsResult<SubscriptionToken> {
        Ok(self.upgrade()?.events.subscribe(handler))
    }

    /// Subscribe to `E` on the scene bus for as long as `owner` is alive
    pub fn subscribe_for<E: Event>(
        &self,
        owner: &EntityHandle,
        handler: impl Fn(&E) + 'static,
    ) -> EcsResult<SubscriptionToken> {
        Ok(self.upgrade()?.events.subscribe_bound(Some(owner.clone()), handler))
    }

    /// Subscribe to the event registered as `event_name` on the scene bus
    pub fn subscribe_named(
        &self,
        event_name: &str,
        handler: impl Fn(&dyn Event) + 'static,
    ) -> EcsResult<SubscriptionToken> {
        let shared = self.upgrade()?;
        let event_type = shared
            .components
            .event_type(event_name)
            .ok_or_else(|| EcsError::not_found("event", event_name))?;
        Ok(shared.events.subscribe_dyn(event_type, None, handler))
    }

    /// Deliver `event` synchronously on the scene bus
    pub fn publish<E: Event>(&self, event: E) -> EcsResult<usize> {
        Ok(self.upgrade()?.events.publish(event))
    }

    /// Deliver an already shared event on the scene bus
    pub fn publish_shared(&self, event: Rc<dyn Event>) -> EcsResult<usize> {
        Ok(self.upgrade()?.events.publish_shared(event))
    }

    /// Queue `event` for delivery at the end of the current tick
    pub fn post<E: Event>(&self, event: E) -> EcsResult<()> {
        self.upgrade()?.events.post(event);
        Ok(())
    }

    /// Deliver `event` on the scene bus, then on every live entity's bus
    ///
    /// Returns the total number of handlers that ran.
    pub fn broadcast<E: Event>(&self, event: E) -> EcsResult<usize> {
        let shared = self.upgrade()?;
        let event: Rc<dyn Event> = Rc::new(event);
        let mut delivered = shared.events.publish_shared(Rc::clone(&event));

        let targets = shared.entities.borrow().all();
        for entity in targets.iter().filter(|entity| entity.alive()) {
            delivered += entity.publish_shared(Rc::clone(&event)).unwrap_or(0);
        }
        Ok(delivered)
    }

    /// Construct the event registered as `name`
    pub fn create_event(&self, name: &str) -> EcsResult<Rc<dyn Event>> {
        self.upgrade()?.components.create_event(name)
    }
}

impl fmt::Debug for SceneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneRef").field("valid", &self.is_valid()).finish()
    }
}
