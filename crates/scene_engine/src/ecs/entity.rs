//! Entities and the handles used to reach them
//!
//! The scene's [`EntityRegistry`](super::EntityRegistry) is the single
//! owner of every entity. Everything else, including components, systems
//! and event handlers, refers to entities through an [`EntityHandle`], a weak
//! reference that degrades gracefully once the entity has been destroyed.

use super::attribute::{Attribute, AttributeSlot, AttributeTable};
use super::behaviour::{self, Behaviour, BehaviourList, BehaviourSlot};
use super::ComponentRegistry;
use crate::error::{EcsError, EcsResult};
use crate::events::{Event, EventBus, SubscriptionToken};
use crate::scene::context::SceneShared;
use crate::scene::SceneRef;
use std::any::{type_name, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

slotmap::new_key_type! {
    /// Identifier of an entity, unique within its scene
    pub struct EntityId;
}

pub(crate) struct Entity {
    id: EntityId,
    name: RefCell<String>,
    alive: Cell<bool>,
    scene: Weak<SceneShared>,
    attributes: RefCell<AttributeTable>,
    behaviours: RefCell<BehaviourList>,
    events: EventBus,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: String, scene: Weak<SceneShared>) -> Self {
        Self {
            id,
            name: RefCell::new(name),
            alive: Cell::new(true),
            scene,
            attributes: RefCell::new(AttributeTable::new()),
            behaviours: RefCell::new(BehaviourList::new()),
            events: EventBus::new(),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.get()
    }

    pub(crate) fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// Flip the alive flag, returning whether it was set
    pub(crate) fn kill(&self) -> bool {
        self.alive.replace(false)
    }

    fn components(&self) -> Option<Rc<ComponentRegistry>> {
        self.scene.upgrade().map(|scene| Rc::clone(&scene.components))
    }

    /// Run every destroy hook and drop all components and subscriptions
    pub(crate) fn teardown(self: &Rc<Self>) {
        let handle = EntityHandle::new(self);
        self.alive.set(false);

        let behaviours = self.behaviours.borrow_mut().drain();
        for slot in &behaviours {
            slot.run_destroy(&handle);
        }
        let attributes = self.attributes.borrow_mut().drain();
        for slot in &attributes {
            slot.run_destroy(&handle);
        }
        self.events.clear();

        log::debug!("Released entity '{}' ({:?})", self.name.borrow(), self.id);
    }
}

/// Weak, cloneable reference to an entity
///
/// Handles compare equal when they refer to the same entity. A handle to a
/// destroyed entity reports `alive() == false`; once the entity has been
/// purged every accessor fails with [`EcsError::NotFound`].
#[derive(Clone)]
pub struct EntityHandle {
    id: EntityId,
    entity: Weak<Entity>,
}

impl EntityHandle {
    pub(crate) fn new(entity: &Rc<Entity>) -> Self {
        Self {
            id: entity.id,
            entity: Rc::downgrade(entity),
        }
    }

    #[cfg(test)]
    pub(crate) fn dangling() -> Self {
        Self {
            id: EntityId::default(),
            entity: Weak::new(),
        }
    }

    fn get(&self) -> EcsResult<Rc<Entity>> {
        self.entity
            .upgrade()
            .ok_or_else(|| EcsError::not_found("entity", format!("{:?}", self.id)))
    }

    /// Identifier within the owning scene
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Whether the entity exists and has not been destroyed
    pub fn alive(&self) -> bool {
        self.entity.upgrade().is_some_and(|entity| entity.is_alive())
    }

    /// Whether the entity's storage has been purged
    pub fn is_released(&self) -> bool {
        self.entity.strong_count() == 0
    }

    /// Display name
    pub fn name(&self) -> EcsResult<String> {
        Ok(self.get()?.name())
    }

    /// Change the display name
    pub fn set_name(&self, name: impl Into<String>) -> EcsResult<()> {
        *self.get()?.name.borrow_mut() = name.into();
        Ok(())
    }

    /// Scene this entity lives in
    pub fn scene(&self) -> EcsResult<SceneRef> {
        let entity = self.get()?;
        if entity.scene.strong_count() == 0 {
            return Err(EcsError::scene_gone());
        }
        Ok(SceneRef::new(entity.scene.clone()))
    }

    // -- Attributes --

    /// Attach `value`, replacing any attribute of the same type
    ///
    /// The new attribute's `create` hook runs before it is stored; if it
    /// fails, nothing is replaced. A replaced attribute gets its `destroy`
    /// hook.
    pub fn set_attribute<T: Attribute>(&self, value: T) -> EcsResult<Rc<RefCell<T>>> {
        let entity = self.get()?;
        let name = entity
            .components()
            .and_then(|registry| registry.attribute_name::<T>().map(str::to_string));
        let (slot, typed) = AttributeSlot::wrap(value, name);
        self.attach_attribute(&entity, slot)?;
        Ok(typed)
    }

    /// Construct and attach the attribute registered as `name`
    pub fn create_attribute(&self, name: &str) -> EcsResult<Rc<RefCell<dyn Attribute>>> {
        let entity = self.get()?;
        let registry = entity.components().ok_or_else(EcsError::scene_gone)?;
        let slot = registry.create_attribute(name)?;
        let shared = Rc::clone(&slot.shared);
        self.attach_attribute(&entity, slot)?;
        Ok(shared)
    }

    fn attach_attribute(&self, entity: &Entity, slot: AttributeSlot) -> EcsResult<()> {
        slot.shared.borrow_mut().create(self)?;
        let label = slot.label.clone();
        let replaced = entity.attributes.borrow_mut().insert(slot);
        if let Some(old) = replaced {
            old.run_destroy(self);
        }
        log::trace!("Attached attribute '{}' to {:?}", label, self.id);
        Ok(())
    }

    /// Attribute of type `T`
    pub fn attribute<T: Attribute>(&self) -> EcsResult<Rc<RefCell<T>>> {
        self.get()?.attributes.borrow().get::<T>()
    }

    /// Attribute registered as `name`
    pub fn attribute_by_name(&self, name: &str) -> EcsResult<Rc<RefCell<dyn Attribute>>> {
        self.get()?.attributes.borrow().get_by_name(name)
    }

    /// Attribute registered as `name`, checked to be a `T`
    pub fn attribute_by_name_as<T: Attribute>(&self, name: &str) -> EcsResult<Rc<RefCell<T>>> {
        self.get()?.attributes.borrow().get_by_name_as::<T>(name)
    }

    /// Whether an attribute of type `T` is attached
    pub fn has_attribute<T: Attribute>(&self) -> bool {
        self.entity
            .upgrade()
            .is_some_and(|entity| entity.attributes.borrow().contains::<T>())
    }

    /// Names of the attached registered attributes
    pub fn attribute_names(&self) -> EcsResult<Vec<String>> {
        let entity = self.get()?;
        let names = entity.attributes.borrow().names().into_iter().map(str::to_string).collect();
        Ok(names)
    }

    /// Detach the attribute of type `T`; returns `false` if there was none
    pub fn remove_attribute<T: Attribute>(&self) -> EcsResult<bool> {
        let entity = self.get()?;
        let removed = entity.attributes.borrow_mut().remove_type(TypeId::of::<T>());
        let Some(slot) = removed else {
            return Ok(false);
        };
        slot.run_destroy(self);
        Ok(true)
    }

    /// Run `f` with mutable access to the attribute of type `T`
    ///
    /// Fails with [`EcsError::InvalidState`] if the attribute is already
    /// borrowed further up the stack.
    pub fn with_attribute<T: Attribute, R>(&self, f: impl FnOnce(&mut T) -> R) -> EcsResult<R> {
        let cell = self.attribute::<T>()?;
        let mut guard = cell.try_borrow_mut().map_err(|_| EcsError::busy(type_name::<T>()))?;
        Ok(f(&mut guard))
    }

    // -- Behaviours --

    /// Append `behaviour`, running its `create` hook first
    pub fn add_behaviour<T: Behaviour>(&self, behaviour: T) -> EcsResult<Rc<RefCell<T>>> {
        let entity = self.get()?;
        let name = entity
            .components()
            .and_then(|registry| registry.behaviour_name::<T>().map(str::to_string));
        let (slot, typed) = BehaviourSlot::wrap(behaviour, name);
        self.attach_behaviour(&entity, slot)?;
        Ok(typed)
    }

    /// Construct and append the behaviour registered as `name`
    pub fn create_behaviour(&self, name: &str) -> EcsResult<Rc<RefCell<dyn Behaviour>>> {
        let entity = self.get()?;
        let registry = entity.components().ok_or_else(EcsError::scene_gone)?;
        let slot = registry.create_behaviour(name)?;
        let shared = Rc::clone(&slot.shared);
        self.attach_behaviour(&entity, slot)?;
        Ok(shared)
    }

    fn attach_behaviour(&self, entity: &Entity, slot: BehaviourSlot) -> EcsResult<()> {
        slot.shared.borrow_mut().create(self)?;
        log::trace!("Attached behaviour '{}' to {:?}", slot.label, self.id);
        entity.behaviours.borrow_mut().push(Rc::new(slot));
        Ok(())
    }

    /// First behaviour of type `T`
    pub fn behaviour<T: Behaviour>(&self) -> EcsResult<Rc<RefCell<T>>> {
        self.get()?.behaviours.borrow().get::<T>()
    }

    /// First behaviour registered as `name`
    pub fn behaviour_by_name(&self, name: &str) -> EcsResult<Rc<RefCell<dyn Behaviour>>> {
        self.get()?.behaviours.borrow().get_by_name(name)
    }

    /// Whether a behaviour of type `T` is attached
    pub fn has_behaviour<T: Behaviour>(&self) -> bool {
        self.entity
            .upgrade()
            .is_some_and(|entity| entity.behaviours.borrow().contains::<T>())
    }

    /// Number of attached behaviours
    pub fn behaviour_count(&self) -> usize {
        self.entity
            .upgrade()
            .map_or(0, |entity| entity.behaviours.borrow().len())
    }

    /// Detach the first behaviour of type `T`
    ///
    /// A behaviour removed while the entity is mid-update is not run for the
    /// rest of that pass.
    pub fn remove_behaviour<T: Behaviour>(&self) -> EcsResult<bool> {
        let entity = self.get()?;
        let removed = entity.behaviours.borrow_mut().remove_type(TypeId::of::<T>());
        let Some(slot) = removed else {
            return Ok(false);
        };
        slot.run_destroy(self);
        Ok(true)
    }

    /// Update every behaviour once, returning the number that failed
    pub(crate) fn update(&self, delta_time: f32) -> usize {
        let Ok(entity) = self.get() else {
            return 0;
        };
        let slots = entity.behaviours.borrow().snapshot();
        behaviour::update_all(&slots, self, delta_time)
    }

    // -- Events --

    /// Subscribe to `E` on this entity's own bus
    ///
    /// Delivery also stops when the entity dies.
    pub fn subscribe<E: Event>(&self, handler: impl Fn(&E) + 'static) -> EcsResult<SubscriptionToken> {
        Ok(self.get()?.events.subscribe_bound(Some(self.clone()), handler))
    }

    /// Subscribe to the event registered as `event_name` on this entity's bus
    pub fn subscribe_named(
        &self,
        event_name: &str,
        handler: impl Fn(&dyn Event) + 'static,
    ) -> EcsResult<SubscriptionToken> {
        let entity = self.get()?;
        let registry = entity.components().ok_or_else(EcsError::scene_gone)?;
        let event_type = registry
            .event_type(event_name)
            .ok_or_else(|| EcsError::not_found("event", event_name))?;
        Ok(entity.events.subscribe_dyn(event_type, Some(self.clone()), handler))
    }

    /// Publish `event` on this entity's bus only
    pub fn publish<E: Event>(&self, event: E) -> EcsResult<usize> {
        Ok(self.get()?.events.publish(event))
    }

    /// Publish an already shared event on this entity's bus
    pub fn publish_shared(&self, event: Rc<dyn Event>) -> EcsResult<usize> {
        Ok(self.get()?.events.publish_shared(event))
    }

    // -- Lifecycle --

    /// Schedule the entity for removal at the end of the current tick
    ///
    /// Returns `false` if it was already dead or purged.
    pub fn destroy(&self) -> bool {
        let Some(entity) = self.entity.upgrade() else {
            return false;
        };
        if !entity.is_alive() {
            return false;
        }
        let Some(scene) = entity.scene.upgrade() else {
            return entity.kill();
        };
        let mut entities = scene.entities.borrow_mut();
        entities.destroy(self.id)
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.entity, &other.entity)
    }
}

impl Eq for EntityHandle {}

impl Hash for EntityHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("EntityHandle");
        debug.field("id", &self.id);
        match self.entity.upgrade() {
            Some(entity) => debug.field("name", &entity.name()).field("alive", &entity.is_alive()),
            None => debug.field("released", &true),
        };
        debug.finish()
    }
}
