//! Census System
//!
//! Counts the live entities of its view every tick.

use crate::ecs::{EntitySet, System};
use crate::error::EcsResult;
use crate::scene::SceneRef;
use std::collections::VecDeque;

/// Records how many live entities the scene held over the recent ticks
#[derive(Debug, Clone)]
pub struct CensusSystem {
    last_count: usize,
    history: VecDeque<usize>,
    capacity: usize,
}

impl CensusSystem {
    /// Ticks kept by [`new`](Self::new)
    pub const DEFAULT_HISTORY: usize = 120;

    /// Create an empty census keeping [`DEFAULT_HISTORY`](Self::DEFAULT_HISTORY) ticks
    pub fn new() -> Self {
        Self::with_history(Self::DEFAULT_HISTORY)
    }

    /// Create an empty census keeping at most `capacity` ticks
    pub fn with_history(capacity: usize) -> Self {
        Self {
            last_count: 0,
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Live entities seen by the most recent tick
    pub fn last_count(&self) -> usize {
        self.last_count
    }

    /// Counts of the most recent ticks, oldest first
    pub fn history(&self) -> impl Iterator<Item = usize> + '_ {
        self.history.iter().copied()
    }
}

impl Default for CensusSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CensusSystem {
    fn process(&mut self, _scene: &SceneRef, entities: &EntitySet, _delta_time: f32) -> EcsResult<()> {
        self.last_count = entities.iter().filter(|entity| entity.alive()).count();
        if self.capacity > 0 {
            if self.history.len() == self.capacity {
                self.history.pop_front();
            }
            self.history.push_back(self.last_count);
        }
        log::debug!("Processing {} entities", self.last_count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::register_builtins;
    use crate::ecs::ComponentRegistry;
    use crate::scene::{EmptyScene, Scene};
    use std::rc::Rc;

    #[test]
    fn test_history_is_bounded() {
        let mut registry = ComponentRegistry::new();
        register_builtins(&mut registry).unwrap();
        let mut scene = Scene::new("census", Rc::new(registry), Box::new(EmptyScene));
        scene.create().unwrap();
        let census = scene.add_system(CensusSystem::with_history(3)).unwrap();

        for name in ["a", "b", "c", "d", "e"] {
            scene.create_entity(name).unwrap();
            scene.update(0.1).unwrap();
        }

        assert_eq!(census.borrow().last_count(), 5);
        assert_eq!(census.borrow().history().collect::<Vec<_>>(), vec![3, 4, 5]);
    }
}
