//! Name-keyed component catalogs
//!
//! A [`ComponentRegistry`] maps stable string names to constructors for
//! attributes, behaviours, systems and events. It is filled once at startup,
//! then shared read-only by every scene through an `Rc`. Typed APIs work
//! without registration; names are only needed for the string-keyed paths
//! ([`EntityHandle::create_attribute`](super::EntityHandle::create_attribute),
//! [`SceneRef::subscribe_named`](crate::scene::SceneRef::subscribe_named), ...).

use super::attribute::{Attribute, AttributeSlot};
use super::behaviour::{Behaviour, BehaviourSlot};
use super::system::{System, SystemSlot};
use crate::error::{EcsError, EcsResult};
use crate::events::Event;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

type AttributeFactory = Box<dyn Fn() -> AttributeSlot>;
type BehaviourFactory = Box<dyn Fn() -> BehaviourSlot>;
type SystemFactory = Box<dyn Fn() -> SystemSlot>;
type EventFactory = Box<dyn Fn() -> Rc<dyn Event>>;

/// One catalog: name to (type tag, factory), plus the reverse type index
struct Catalog<F> {
    kind: &'static str,
    by_name: HashMap<String, (TypeId, F)>,
    by_type: HashMap<TypeId, String>,
}

impl<F> Catalog<F> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            by_name: HashMap::new(),
            by_type: HashMap::new(),
        }
    }

    fn register(&mut self, name: &str, type_id: TypeId, factory: F) -> EcsResult<()> {
        if self.by_name.contains_key(name) {
            return Err(EcsError::duplicate(self.kind, name));
        }
        if let Some(existing) = self.by_type.get(&type_id) {
            return Err(EcsError::duplicate(self.kind, format!("{name} (type already registered as {existing})")));
        }
        self.by_name.insert(name.to_string(), (type_id, factory));
        self.by_type.insert(type_id, name.to_string());
        log::debug!("Registered {} '{}'", self.kind, name);
        Ok(())
    }

    fn name_of(&self, type_id: TypeId) -> Option<&str> {
        self.by_type.get(&type_id).map(String::as_str)
    }

    fn type_of(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).map(|(type_id, _)| *type_id)
    }

    fn factory(&self, name: &str) -> EcsResult<&F> {
        self.by_name
            .get(name)
            .map(|(_, factory)| factory)
            .ok_or_else(|| EcsError::not_found(self.kind, name))
    }

    fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Catalog of constructible components, keyed by stable names
pub struct ComponentRegistry {
    attributes: Catalog<AttributeFactory>,
    behaviours: Catalog<BehaviourFactory>,
    systems: Catalog<SystemFactory>,
    events: Catalog<EventFactory>,
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            attributes: Catalog::new("attribute"),
            behaviours: Catalog::new("behaviour"),
            systems: Catalog::new("system"),
            events: Catalog::new("event"),
        }
    }

    /// Register an attribute type under `name`
    pub fn register_attribute<T: Attribute>(
        &mut self,
        name: &str,
        factory: impl Fn() -> T + 'static,
    ) -> EcsResult<()> {
        let slot_name = name.to_string();
        self.attributes.register(
            name,
            TypeId::of::<T>(),
            Box::new(move || AttributeSlot::new(factory(), Some(slot_name.clone()))),
        )
    }

    /// Register a behaviour type under `name`
    pub fn register_behaviour<T: Behaviour>(
        &mut self,
        name: &str,
        factory: impl Fn() -> T + 'static,
    ) -> EcsResult<()> {
        let slot_name = name.to_string();
        self.behaviours.register(
            name,
            TypeId::of::<T>(),
            Box::new(move || BehaviourSlot::new(factory(), Some(slot_name.clone()))),
        )
    }

    /// Register a system type under `name`
    pub fn register_system<T: System>(&mut self, name: &str, factory: impl Fn() -> T + 'static) -> EcsResult<()> {
        let slot_name = name.to_string();
        self.systems.register(
            name,
            TypeId::of::<T>(),
            Box::new(move || SystemSlot::new(factory(), Some(slot_name.clone()))),
        )
    }

    /// Register an event type under `name`
    pub fn register_event<E: Event>(&mut self, name: &str, factory: impl Fn() -> E + 'static) -> EcsResult<()> {
        self.events.register(
            name,
            TypeId::of::<E>(),
            Box::new(move || Rc::new(factory()) as Rc<dyn Event>),
        )
    }

    /// Registered name of attribute type `T`
    pub fn attribute_name<T: Attribute>(&self) -> Option<&str> {
        self.attributes.name_of(TypeId::of::<T>())
    }

    /// Registered name of behaviour type `T`
    pub fn behaviour_name<T: Behaviour>(&self) -> Option<&str> {
        self.behaviours.name_of(TypeId::of::<T>())
    }

    /// Registered name of system type `T`
    pub fn system_name<T: System>(&self) -> Option<&str> {
        self.systems.name_of(TypeId::of::<T>())
    }

    /// Registered name of event type `E`
    pub fn event_name<E: Event>(&self) -> Option<&str> {
        self.events.name_of(TypeId::of::<E>())
    }

    /// Type tag of the attribute registered as `name`
    pub fn attribute_type(&self, name: &str) -> Option<TypeId> {
        self.attributes.type_of(name)
    }

    /// Type tag of the event registered as `name`
    pub fn event_type(&self, name: &str) -> Option<TypeId> {
        self.events.type_of(name)
    }

    /// Sorted attribute names
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.names()
    }

    /// Sorted behaviour names
    pub fn behaviour_names(&self) -> Vec<&str> {
        self.behaviours.names()
    }

    /// Sorted system names
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.names()
    }

    /// Sorted event names
    pub fn event_names(&self) -> Vec<&str> {
        self.events.names()
    }

    pub(crate) fn create_attribute(&self, name: &str) -> EcsResult<AttributeSlot> {
        self.attributes.factory(name).map(|factory| factory())
    }

    pub(crate) fn create_behaviour(&self, name: &str) -> EcsResult<BehaviourSlot> {
        self.behaviours.factory(name).map(|factory| factory())
    }

    pub(crate) fn create_system(&self, name: &str) -> EcsResult<SystemSlot> {
        self.systems.factory(name).map(|factory| factory())
    }

    /// Construct a fresh event registered as `name`
    pub fn create_event(&self, name: &str) -> EcsResult<Rc<dyn Event>> {
        self.events.factory(name).map(|factory| factory())
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("attributes", &self.attribute_names())
            .field("behaviours", &self.behaviour_names())
            .field("systems", &self.system_names())
            .field("events", &self.event_names())
            .finish()
    }
}
