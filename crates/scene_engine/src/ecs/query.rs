//! Read-only entity views
//!
//! An [`EntitySet`] is a snapshot: it holds weak handles, so entities
//! destroyed after the snapshot was taken still appear in it with
//! `alive() == false` until the set is rebuilt.

use super::EntityHandle;
use crate::error::{EcsError, EcsResult};
use rand::Rng;

/// Ordered snapshot of entity handles
#[derive(Debug, Clone, Default)]
pub struct EntitySet {
    entities: Vec<EntityHandle>,
}

impl EntitySet {
    pub(crate) fn from_vec(entities: Vec<EntityHandle>) -> Self {
        Self { entities }
    }

    /// Number of handles in the snapshot
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Alias of [`len`](Self::len)
    pub fn size(&self) -> usize {
        self.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate in creation order
    pub fn iter(&self) -> std::slice::Iter<'_, EntityHandle> {
        self.entities.iter()
    }

    /// Handle at `index`
    pub fn get(&self, index: usize) -> Option<&EntityHandle> {
        self.entities.get(index)
    }

    /// Whether `entity` is part of the snapshot
    pub fn contains(&self, entity: &EntityHandle) -> bool {
        self.entities.contains(entity)
    }

    /// First live entity called `name`
    pub fn find_by_name(&self, name: &str) -> Option<EntityHandle> {
        self.entities
            .iter()
            .find(|entity| entity.alive() && entity.name().is_ok_and(|n| n == name))
            .cloned()
    }

    /// Subset for which `predicate` holds
    pub fn filter(&self, mut predicate: impl FnMut(&EntityHandle) -> bool) -> Self {
        Self::from_vec(self.entities.iter().filter(|e| predicate(*e)).cloned().collect())
    }

    /// Subset that is still alive right now
    pub fn alive(&self) -> Self {
        self.filter(EntityHandle::alive)
    }

    /// Pick a random entity other than `exclude`
    ///
    /// Draws at most `len - 1` times, then falls back to the first entity
    /// that is not `exclude`, so it always terminates. Liveness is not
    /// checked; callers skip dead picks themselves.
    pub fn pick_other<R: Rng + ?Sized>(&self, exclude: &EntityHandle, rng: &mut R) -> EcsResult<EntityHandle> {
        let count = self.entities.len();
        if count < 2 {
            return Err(EcsError::Bounds {
                available: count,
                reason: "need at least one entity besides the excluded one",
            });
        }

        for _ in 0..count - 1 {
            let candidate = &self.entities[rng.gen_range(0..count)];
            if candidate != exclude {
                return Ok(candidate.clone());
            }
        }

        self.entities
            .iter()
            .find(|entity| *entity != exclude)
            .cloned()
            .ok_or(EcsError::Bounds {
                available: count,
                reason: "every entity is the excluded one",
            })
    }
}

impl<'a> IntoIterator for &'a EntitySet {
    type Item = &'a EntityHandle;
    type IntoIter = std::slice::Iter<'a, EntityHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ComponentRegistry;
    use crate::scene::{EmptyScene, Scene};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::rc::Rc;

    fn scene_with(names: &[&str]) -> (Scene, Vec<EntityHandle>) {
        let mut scene = Scene::new("query", Rc::new(ComponentRegistry::new()), Box::new(EmptyScene));
        scene.create().unwrap();
        let handles = names.iter().map(|name| scene.create_entity(*name).unwrap()).collect();
        (scene, handles)
    }

    #[test]
    fn test_pick_other_needs_two_entities() {
        let (scene, handles) = scene_with(&["solo"]);
        let mut rng = StdRng::seed_from_u64(1);

        let result = scene.entities().unwrap().pick_other(&handles[0], &mut rng);
        assert!(matches!(result, Err(EcsError::Bounds { available: 1, .. })));
    }

    #[test]
    fn test_pick_other_never_returns_excluded() {
        let (scene, handles) = scene_with(&["a", "b", "c"]);
        let set = scene.entities().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let picked = set.pick_other(&handles[1], &mut rng).unwrap();
            assert_ne!(picked, handles[1]);
        }
    }

    #[test]
    fn test_pick_other_with_two_always_returns_the_other() {
        let (scene, handles) = scene_with(&["a", "b"]);
        let set = scene.entities().unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            assert_eq!(set.pick_other(&handles[0], &mut rng).unwrap(), handles[1]);
        }
    }

    #[test]
    fn test_snapshot_keeps_destroyed_entities() {
        let (scene, handles) = scene_with(&["a", "b"]);
        let set = scene.entities().unwrap();
        handles[0].destroy();

        assert_eq!(set.len(), 2);
        assert!(!set.iter().next().unwrap().alive());
        assert_eq!(set.alive().len(), 1);
        assert!(set.find_by_name("a").is_none());
        assert_eq!(set.find_by_name("b"), Some(handles[1].clone()));
    }
}
