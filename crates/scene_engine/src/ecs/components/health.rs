//! Health Attribute
//!
//! Bounded hit points. Reaching zero announces the death with an
//! [`EntityDiedEvent`] and schedules the owner for removal.

use crate::ecs::{Attribute, EntityHandle, EntityId};
use crate::error::EcsResult;
use crate::events::Event;
use std::any::Any;
use std::rc::Rc;

/// Published once when an entity's health reaches zero
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDiedEvent {
    /// Entity that died
    pub entity: EntityId,
    /// Its name at the time of death
    pub name: String,
}

impl Event for EntityDiedEvent {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Hit points clamped to `[0, max]`
#[derive(Debug, Clone)]
pub struct HealthAttribute {
    value: f32,
    max: f32,
    owner: Option<EntityHandle>,
}

impl HealthAttribute {
    /// Maximum used by [`Default`]
    pub const DEFAULT_MAX: f32 = 100.0;

    /// Full health with the given maximum
    pub fn new(max: f32) -> Self {
        Self::with_value(max, max)
    }

    /// Explicit starting value, clamped into `[0, max]`
    ///
    /// An attribute that starts at zero announces its owner's death as soon
    /// as it is attached.
    pub fn with_value(value: f32, max: f32) -> Self {
        let max = max.max(0.0);
        Self {
            value: value.clamp(0.0, max),
            max,
            owner: None,
        }
    }

    /// Current hit points
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Upper bound
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Whether the value has reached zero
    pub fn is_depleted(&self) -> bool {
        self.value <= 0.0
    }

    /// Heal by `amount`, never exceeding the maximum
    pub fn increase(&mut self, amount: f32) {
        self.value = (self.value + amount.max(0.0)).min(self.max);
    }

    /// Damage by `amount`, never dropping below zero
    ///
    /// Returns `true` only for the call that brings the value to zero.
    /// Further damage to a depleted attribute is ignored, so the death is
    /// announced exactly once.
    pub fn decrease(&mut self, amount: f32) -> bool {
        if self.is_depleted() {
            return false;
        }
        self.value = (self.value - amount.max(0.0)).max(0.0);
        if !self.is_depleted() {
            return false;
        }
        if let Some(owner) = &self.owner {
            announce_death(owner);
        }
        true
    }
}

impl Default for HealthAttribute {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX)
    }
}

impl Attribute for HealthAttribute {
    fn create(&mut self, owner: &EntityHandle) -> EcsResult<()> {
        self.owner = Some(owner.clone());
        if self.is_depleted() {
            announce_death(owner);
        }
        Ok(())
    }

    fn destroy(&mut self, _owner: &EntityHandle) {
        self.owner = None;
    }
}

fn announce_death(owner: &EntityHandle) {
    let name = owner.name().unwrap_or_default();
    log::info!("{} has gone to a better place", name);

    let event: Rc<dyn Event> = Rc::new(EntityDiedEvent { entity: owner.id(), name });
    let _ = owner.publish_shared(Rc::clone(&event));
    if let Ok(scene) = owner.scene() {
        let _ = scene.publish_shared(event);
    }
    owner.destroy();
}
