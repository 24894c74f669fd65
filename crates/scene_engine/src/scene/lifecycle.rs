//! Scene lifecycle and the per-tick update order

use super::context::{SceneRef, SceneShared};
use crate::config::SceneConfig;
use crate::ecs::system::{prepare_views, process_all};
use crate::ecs::{ComponentRegistry, EntityHandle, EntitySet, System};
use crate::error::{EcsError, EcsResult};
use crate::events::{Event, SubscriptionToken};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

/// Where a scene is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    /// Constructed, `create` not called yet
    Uninitialized,
    /// `create` started; stays here if scene logic failed to create
    Created,
    /// Ticking
    Running,
    /// Paused underneath another scene
    Suspended,
    /// Torn down; only accessors remain usable
    Destroyed,
}

/// Application hooks driven by a [`Scene`]
pub trait SceneLogic {
    /// Populate the scene; called once from [`Scene::create`]
    fn create(&mut self, _scene: &SceneRef) -> EcsResult<()> {
        Ok(())
    }

    /// Called at the start of every tick, before behaviours
    fn update(&mut self, _scene: &SceneRef, _delta_time: f32) -> EcsResult<()> {
        Ok(())
    }

    /// Called when another scene is pushed on top
    fn suspend(&mut self, _scene: &SceneRef) {}

    /// Called when the scene becomes the top of the stack again
    fn resume(&mut self, _scene: &SceneRef) {}

    /// Called before entities and systems are torn down
    fn destroy(&mut self, _scene: &SceneRef) {}
}

/// Scene logic that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyScene;

impl SceneLogic for EmptyScene {}

/// Counters collected while a scene ticks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneStats {
    /// Completed ticks
    pub frames: u64,
    /// Entities stored after the last tick
    pub entity_count: usize,
    /// Systems in the scene
    pub system_count: usize,
    /// Entities purged by the last tick
    pub destroyed_last_tick: usize,
    /// Queued events delivered by the last tick
    pub events_flushed_last_tick: usize,
    /// Component and scene logic failures since creation
    pub component_failures: u64,
    /// Wall time of the last tick in microseconds
    pub last_tick_us: u64,
}

/// Container of entities, systems and a scene bus
///
/// A scene ticks in a fixed order: scene logic, every live entity's
/// behaviours in creation order, every system in insertion order, the purge
/// of entities destroyed during the tick, and finally the delivery of
/// events posted with [`SceneRef::post`].
pub struct Scene {
    name: String,
    shared: Option<Rc<SceneShared>>,
    logic: Option<Box<dyn SceneLogic>>,
    state: SceneState,
    config: SceneConfig,
    stats: SceneStats,
}

impl Scene {
    /// Create an uninitialized scene with default settings
    pub fn new(name: impl Into<String>, components: Rc<ComponentRegistry>, logic: Box<dyn SceneLogic>) -> Self {
        Self::with_config(name, components, logic, SceneConfig::default())
    }

    /// Create an uninitialized scene
    pub fn with_config(
        name: impl Into<String>,
        components: Rc<ComponentRegistry>,
        logic: Box<dyn SceneLogic>,
        config: SceneConfig,
    ) -> Self {
        Self {
            name: name.into(),
            shared: Some(Rc::new(SceneShared::new(components, &config))),
            logic: Some(logic),
            state: SceneState::Uninitialized,
            config,
            stats: SceneStats::default(),
        }
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> SceneState {
        self.state
    }

    /// Settings the scene was built with
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Statistics of the ticks so far
    pub fn stats(&self) -> &SceneStats {
        &self.stats
    }

    /// Weak handle to this scene; invalid once the scene is destroyed
    pub fn handle(&self) -> SceneRef {
        SceneRef::new(self.shared.as_ref().map(Rc::downgrade).unwrap_or_default())
    }

    fn shared(&self) -> EcsResult<Rc<SceneShared>> {
        self.shared.clone().ok_or_else(EcsError::scene_gone)
    }

    fn run_logic<R>(&mut self, f: impl FnOnce(&mut dyn SceneLogic, &SceneRef) -> R) -> Option<R> {
        let mut logic = self.logic.take()?;
        let scene = self.handle();
        let result = f(logic.as_mut(), &scene);
        self.logic = Some(logic);
        Some(result)
    }

    fn transition(&mut self, from: SceneState, to: SceneState) -> EcsResult<()> {
        if self.state != from {
            return Err(EcsError::InvalidState(format!(
                "scene '{}' cannot go from {:?} to {:?}",
                self.name, self.state, to
            )));
        }
        self.state = to;
        Ok(())
    }

    /// Run the scene logic's `create` hook and start running
    ///
    /// If the hook fails the error is returned and the scene stays in
    /// [`SceneState::Created`].
    pub fn create(&mut self) -> EcsResult<()> {
        self.transition(SceneState::Uninitialized, SceneState::Created)?;
        log::info!("Creating scene '{}'", self.name);

        if let Some(Err(err)) = self.run_logic(|logic, scene| logic.create(scene)) {
            log::error!("Scene '{}' failed to create: {}", self.name, err);
            return Err(err);
        }
        self.state = SceneState::Running;
        Ok(())
    }

    /// Advance the scene by `delta_time` seconds
    pub fn update(&mut self, delta_time: f32) -> EcsResult<()> {
        if self.state != SceneState::Running {
            return Err(EcsError::InvalidState(format!(
                "scene '{}' cannot update while {:?}",
                self.name, self.state
            )));
        }
        let shared = self.shared()?;
        let scene = self.handle();
        let started = Instant::now();
        let mut failures = 0;

        if let Some(Err(err)) = self.run_logic(|logic, scene| logic.update(scene, delta_time)) {
            log::error!("Scene '{}' logic failed to update: {}", self.name, err);
            failures += 1;
        }

        let snapshot = shared.entities.borrow().all();
        let systems = shared.systems.borrow().snapshot();
        let views = prepare_views(systems, &snapshot);

        for entity in &snapshot {
            if entity.alive() {
                failures += entity.update(delta_time);
            }
        }
        failures += process_all(&views, &scene, delta_time);

        let removed = shared.entities.borrow_mut().purge();
        for entity in &removed {
            entity.teardown();
        }
        let flushed = shared.events.flush();

        self.stats.frames += 1;
        self.stats.component_failures += failures as u64;
        if self.config.enable_stats {
            self.stats.entity_count = shared.entities.borrow().len();
            self.stats.system_count = shared.systems.borrow().len();
            self.stats.destroyed_last_tick = removed.len();
            self.stats.events_flushed_last_tick = flushed;
            self.stats.last_tick_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        }
        log::trace!(
            "Scene '{}' tick {}: {} purged, {} events flushed",
            self.name,
            self.stats.frames,
            removed.len(),
            flushed
        );
        Ok(())
    }

    /// Pause a running scene
    pub fn suspend(&mut self) -> EcsResult<()> {
        self.transition(SceneState::Running, SceneState::Suspended)?;
        log::debug!("Suspending scene '{}'", self.name);
        self.run_logic(|logic, scene| logic.suspend(scene));
        Ok(())
    }

    /// Continue a suspended scene
    pub fn resume(&mut self) -> EcsResult<()> {
        self.transition(SceneState::Suspended, SceneState::Running)?;
        log::debug!("Resuming scene '{}'", self.name);
        self.run_logic(|logic, scene| logic.resume(scene));
        Ok(())
    }

    /// Tear the scene down
    ///
    /// Runs the scene logic's `destroy` hook, releases every entity with its
    /// components, destroys the systems and clears the scene bus. Outstanding
    /// [`SceneRef`]s, entity handles and subscription tokens become inert.
    pub fn destroy(&mut self) -> EcsResult<()> {
        if self.state == SceneState::Destroyed {
            return Err(EcsError::InvalidState(format!("scene '{}' is already destroyed", self.name)));
        }
        log::info!("Destroying scene '{}'", self.name);
        if self.state != SceneState::Uninitialized {
            self.run_logic(|logic, scene| logic.destroy(scene));
        }

        if let Some(shared) = self.shared.take() {
            shared.close();
            let scene = SceneRef::new(Rc::downgrade(&shared));

            let entities = shared.entities.borrow_mut().destroy_all();
            for entity in &entities {
                entity.teardown();
            }
            let systems = shared.systems.borrow_mut().drain();
            for slot in &systems {
                slot.run_destroy(&scene);
            }
            shared.events.clear();
            log::debug!(
                "Scene '{}' released {} entities and {} systems",
                self.name,
                entities.len(),
                systems.len()
            );
        }

        self.logic = None;
        self.state = SceneState::Destroyed;
        Ok(())
    }

    // -- Shortcuts through the scene handle --

    /// See [`SceneRef::create_entity`]
    pub fn create_entity(&self, name: impl Into<String>) -> EcsResult<EntityHandle> {
        self.handle().create_entity(name)
    }

    /// See [`SceneRef::entities`]
    pub fn entities(&self) -> EcsResult<EntitySet> {
        self.handle().entities()
    }

    /// See [`SceneRef::find_entity`]
    pub fn find_entity(&self, name: &str) -> EcsResult<EntityHandle> {
        self.handle().find_entity(name)
    }

    /// See [`SceneRef::add_system`]
    pub fn add_system<T: System>(&self, system: T) -> EcsResult<Rc<RefCell<T>>> {
        self.handle().add_system(system)
    }

    /// See [`SceneRef::subscribe`]
    pub fn subscribe<E: Event>(&self, handler: impl Fn(&E) + 'static) -> EcsResult<SubscriptionToken> {
        self.handle().subscribe(handler)
    }

    /// See [`SceneRef::publish`]
    pub fn publish<E: Event>(&self, event: E) -> EcsResult<usize> {
        self.handle().publish(event)
    }

    /// See [`SceneRef::post`]
    pub fn post<E: Event>(&self, event: E) -> EcsResult<()> {
        self.handle().post(event)
    }

    /// See [`SceneRef::broadcast`]
    pub fn broadcast<E: Event>(&self, event: E) -> EcsResult<usize> {
        self.handle().broadcast(event)
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        if self.state != SceneState::Destroyed {
            let _ = self.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Journal {
        entries: Rc<RefCell<Vec<&'static str>>>,
        fail_create: bool,
    }

    impl SceneLogic for Journal {
        fn create(&mut self, scene: &SceneRef) -> EcsResult<()> {
            self.entries.borrow_mut().push("create");
            if self.fail_create {
                return Err(EcsError::Custom("no level data".to_string()));
            }
            scene.create_entity("player")?;
            Ok(())
        }

        fn update(&mut self, _scene: &SceneRef, _delta_time: f32) -> EcsResult<()> {
            self.entries.borrow_mut().push("update");
            Ok(())
        }

        fn suspend(&mut self, _scene: &SceneRef) {
            self.entries.borrow_mut().push("suspend");
        }

        fn resume(&mut self, _scene: &SceneRef) {
            self.entries.borrow_mut().push("resume");
        }

        fn destroy(&mut self, _scene: &SceneRef) {
            self.entries.borrow_mut().push("destroy");
        }
    }

    fn journal_scene(fail_create: bool) -> (Scene, Rc<RefCell<Vec<&'static str>>>) {
        let entries = Rc::new(RefCell::new(Vec::new()));
        let logic = Journal { entries: Rc::clone(&entries), fail_create };
        let scene = Scene::new("journal", Rc::new(ComponentRegistry::new()), Box::new(logic));
        (scene, entries)
    }

    #[test]
    fn test_full_lifecycle_runs_hooks_in_order() {
        let (mut scene, entries) = journal_scene(false);
        scene.create().unwrap();
        scene.update(0.016).unwrap();
        scene.suspend().unwrap();
        scene.resume().unwrap();
        scene.destroy().unwrap();

        assert_eq!(*entries.borrow(), vec!["create", "update", "suspend", "resume", "destroy"]);
        assert_eq!(scene.state(), SceneState::Destroyed);
    }

    #[test]
    fn test_failed_create_stays_created() {
        let (mut scene, _entries) = journal_scene(true);

        assert!(scene.create().is_err());
        assert_eq!(scene.state(), SceneState::Created);
        assert!(matches!(scene.update(0.1), Err(EcsError::InvalidState(_))));
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let (mut scene, _entries) = journal_scene(false);

        assert!(matches!(scene.update(0.1), Err(EcsError::InvalidState(_))));
        assert!(scene.resume().is_err());
        scene.create().unwrap();
        assert!(scene.create().is_err());
        assert!(scene.resume().is_err());
        scene.suspend().unwrap();
        assert!(scene.update(0.1).is_err());
        scene.destroy().unwrap();
        assert!(matches!(scene.update(0.1), Err(EcsError::InvalidState(_))));
        assert!(scene.destroy().is_err());
    }

    #[test]
    fn test_destroy_invalidates_outstanding_handles() {
        let (mut scene, _entries) = journal_scene(false);
        scene.create().unwrap();
        let handle = scene.handle();
        let player = scene.find_entity("player").unwrap();

        scene.destroy().unwrap();

        assert!(!handle.is_valid());
        assert!(!player.alive());
        assert!(player.is_released());
        assert!(matches!(handle.create_entity("late"), Err(EcsError::InvalidState(_))));
    }

    #[test]
    fn test_dropping_scene_runs_destroy_hook() {
        let (mut scene, entries) = journal_scene(false);
        scene.create().unwrap();
        drop(scene);

        assert_eq!(entries.borrow().last(), Some(&"destroy"));
    }

    #[test]
    fn test_stats_track_purges() {
        let (mut scene, _entries) = journal_scene(false);
        scene.create().unwrap();
        let victim = scene.create_entity("victim").unwrap();

        victim.destroy();
        scene.update(0.1).unwrap();

        assert_eq!(scene.stats().destroyed_last_tick, 1);
        assert_eq!(scene.stats().frames, 1);
        assert_eq!(scene.stats().entity_count, 1);
        assert!(victim.is_released());
    }
}
