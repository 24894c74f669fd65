//! Entity storage of one scene
//!
//! Destruction is two-phase. [`EntityRegistry::destroy`] only flips the
//! alive flag and queues the id; the owning scene calls `purge` at a safe
//! point of its tick, which removes the queued entities and hands them back
//! so their component teardown can run outside of any registry borrow.

use super::entity::{Entity, EntityHandle, EntityId};
use super::EntitySet;
use crate::error::{EcsError, EcsResult};
use crate::scene::context::SceneShared;
use slotmap::SlotMap;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Owns every entity of a scene
pub struct EntityRegistry {
    entities: SlotMap<EntityId, Rc<Entity>>,
    order: Vec<EntityId>,
    pending: Vec<EntityId>,
    groups: HashMap<String, Vec<EntityId>>,
    max_entities: usize,
}

impl EntityRegistry {
    /// Create a registry that refuses to hold more than `max_entities`
    pub fn new(max_entities: usize) -> Self {
        Self {
            entities: SlotMap::with_key(),
            order: Vec::new(),
            pending: Vec::new(),
            groups: HashMap::new(),
            max_entities,
        }
    }

    pub(crate) fn create(&mut self, name: String, scene: Weak<SceneShared>) -> EcsResult<EntityHandle> {
        if self.entities.len() >= self.max_entities {
            return Err(EcsError::CapacityExceeded { limit: self.max_entities });
        }
        let id = self
            .entities
            .insert_with_key(|id| Rc::new(Entity::new(id, name, scene)));
        self.order.push(id);

        let entity = &self.entities[id];
        log::debug!("Created entity '{}' ({:?})", entity.name(), id);
        Ok(EntityHandle::new(entity))
    }

    /// Snapshot of every stored entity in creation order
    ///
    /// Includes entities that were destroyed this tick but not yet purged.
    pub fn all(&self) -> EntitySet {
        EntitySet::from_vec(
            self.order
                .iter()
                .filter_map(|id| self.entities.get(*id))
                .map(EntityHandle::new)
                .collect(),
        )
    }

    /// Number of stored entities, pending removals included
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of entities that are still alive
    pub fn alive_count(&self) -> usize {
        self.entities.values().filter(|entity| entity.is_alive()).count()
    }

    /// Number of entities waiting for the next purge
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Live entity with identifier `id`
    pub fn get(&self, id: EntityId) -> Option<EntityHandle> {
        self.entities
            .get(id)
            .filter(|entity| entity.is_alive())
            .map(EntityHandle::new)
    }

    /// First live entity called `name`, in creation order
    pub fn find_by_name(&self, name: &str) -> EcsResult<EntityHandle> {
        self.order
            .iter()
            .filter_map(|id| self.entities.get(*id))
            .find(|entity| entity.is_alive() && entity.name() == name)
            .map(EntityHandle::new)
            .ok_or_else(|| EcsError::not_found("entity", name))
    }

    /// Mark `id` dead and queue it for the next purge
    ///
    /// Returns `false` when the entity is unknown or already dead.
    pub(crate) fn destroy(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get(id) else {
            return false;
        };
        if !entity.kill() {
            return false;
        }
        log::debug!("Entity '{}' ({:?}) scheduled for removal", entity.name(), id);
        self.pending.push(id);
        true
    }

    /// Remove every queued entity, returning them for teardown
    pub(crate) fn purge(&mut self) -> Vec<Rc<Entity>> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let pending = std::mem::take(&mut self.pending);
        let removed: Vec<Rc<Entity>> = pending
            .iter()
            .filter_map(|id| self.entities.remove(*id))
            .collect();

        self.order.retain(|id| self.entities.contains_key(*id));
        for members in self.groups.values_mut() {
            members.retain(|id| self.entities.contains_key(*id));
        }
        self.groups.retain(|_, members| !members.is_empty());
        removed
    }

    /// Kill and remove everything, in creation order
    pub(crate) fn destroy_all(&mut self) -> Vec<Rc<Entity>> {
        let order = std::mem::take(&mut self.order);
        self.pending.clear();
        self.groups.clear();
        let removed: Vec<Rc<Entity>> = order
            .into_iter()
            .filter_map(|id| self.entities.remove(id))
            .collect();
        for entity in &removed {
            entity.kill();
        }
        removed
    }

    fn check_member(&self, entity: &EntityHandle) -> EcsResult<EntityId> {
        match self.entities.get(entity.id()) {
            Some(stored) if EntityHandle::new(stored) == *entity => Ok(entity.id()),
            _ => Err(EcsError::not_found("entity", format!("{:?}", entity.id()))),
        }
    }

    /// Add `entity` to `group`; returns `false` if it was already a member
    pub fn add_to_group(&mut self, group: &str, entity: &EntityHandle) -> EcsResult<bool> {
        let id = self.check_member(entity)?;
        let members = self.groups.entry(group.to_string()).or_default();
        if members.contains(&id) {
            return Ok(false);
        }
        members.push(id);
        Ok(true)
    }

    /// Remove `entity` from `group`; returns `false` if it was not a member
    pub fn remove_from_group(&mut self, group: &str, entity: &EntityHandle) -> bool {
        let Some(members) = self.groups.get_mut(group) else {
            return false;
        };
        let before = members.len();
        members.retain(|id| *id != entity.id());
        let removed = members.len() != before;
        if members.is_empty() {
            self.groups.remove(group);
        }
        removed
    }

    /// Members of `group` in the order they joined
    pub fn group(&self, group: &str) -> EntitySet {
        let members = self.groups.get(group).map(Vec::as_slice).unwrap_or_default();
        EntitySet::from_vec(
            members
                .iter()
                .filter_map(|id| self.entities.get(*id))
                .map(EntityHandle::new)
                .collect(),
        )
    }

    /// Sorted names of the groups `entity` belongs to
    pub fn groups_of(&self, entity: &EntityHandle) -> Vec<String> {
        let mut names: Vec<String> = self
            .groups
            .iter()
            .filter(|(_, members)| members.contains(&entity.id()))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(max: usize) -> EntityRegistry {
        EntityRegistry::new(max)
    }

    #[test]
    fn test_create_respects_capacity() {
        let mut entities = registry(2);
        entities.create("a".to_string(), Weak::new()).unwrap();
        entities.create("b".to_string(), Weak::new()).unwrap();

        let result = entities.create("c".to_string(), Weak::new());
        assert!(matches!(result, Err(EcsError::CapacityExceeded { limit: 2 })));
    }

    #[test]
    fn test_destroy_defers_removal_until_purge() {
        let mut entities = registry(8);
        let a = entities.create("a".to_string(), Weak::new()).unwrap();
        let b = entities.create("b".to_string(), Weak::new()).unwrap();

        assert!(entities.destroy(a.id()));
        assert!(!entities.destroy(a.id()));
        assert!(!a.alive());
        assert_eq!(entities.all().len(), 2);
        assert_eq!(entities.pending_count(), 1);
        assert!(entities.get(a.id()).is_none());
        assert!(entities.find_by_name("a").is_err());

        let removed = entities.purge();
        assert_eq!(removed.len(), 1);
        assert_eq!(entities.all().len(), 1);
        assert_eq!(entities.find_by_name("b").unwrap(), b);
    }

    #[test]
    fn test_purged_handles_stay_dead_after_release() {
        let mut entities = registry(8);
        let a = entities.create("a".to_string(), Weak::new()).unwrap();
        entities.destroy(a.id());
        drop(entities.purge());

        assert!(a.is_released());
        assert!(!a.alive());
        assert!(a.name().is_err());
    }

    #[test]
    fn test_all_preserves_creation_order() {
        let mut entities = registry(8);
        for name in ["x", "y", "z"] {
            entities.create(name.to_string(), Weak::new()).unwrap();
        }
        let names: Vec<String> = entities.all().iter().map(|e| e.name().unwrap()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_groups_track_membership() {
        let mut entities = registry(8);
        let a = entities.create("a".to_string(), Weak::new()).unwrap();
        let b = entities.create("b".to_string(), Weak::new()).unwrap();

        assert!(entities.add_to_group("enemies", &a).unwrap());
        assert!(!entities.add_to_group("enemies", &a).unwrap());
        entities.add_to_group("enemies", &b).unwrap();
        entities.add_to_group("bosses", &b).unwrap();

        assert_eq!(entities.group("enemies").len(), 2);
        assert_eq!(entities.groups_of(&b), vec!["bosses".to_string(), "enemies".to_string()]);

        entities.destroy(b.id());
        drop(entities.purge());
        assert_eq!(entities.group("enemies").len(), 1);
        assert!(entities.group("bosses").is_empty());
        assert!(!entities.remove_from_group("bosses", &b));
        assert!(entities.remove_from_group("enemies", &a));
    }

    #[test]
    fn test_foreign_handle_rejected_from_groups() {
        let mut first = registry(8);
        let mut second = registry(8);
        let stranger = second.create("stranger".to_string(), Weak::new()).unwrap();
        first.create("local".to_string(), Weak::new()).unwrap();

        assert!(first.add_to_group("g", &stranger).is_err());
    }
}
