//! Stack of named scenes
//!
//! Only the top scene ticks. Pushing suspends the scene underneath and
//! popping resumes it, so overlays such as pause menus can sit above a
//! running level without tearing it down.

use super::{Scene, SceneLogic, SceneState};
use crate::config::EngineConfig;
use crate::ecs::ComponentRegistry;
use crate::error::{EcsError, EcsResult};
use crate::foundation::logging;
use std::collections::HashMap;
use std::rc::Rc;

type SceneFactory = Box<dyn Fn() -> Box<dyn SceneLogic>>;

/// Owns the active scenes and the factories that create them
pub struct SceneStack {
    components: Rc<ComponentRegistry>,
    factories: HashMap<String, SceneFactory>,
    scenes: Vec<Scene>,
    config: EngineConfig,
}

impl SceneStack {
    /// Create an empty stack sharing `components` with every scene
    pub fn new(components: ComponentRegistry) -> Self {
        Self::with_config(components, EngineConfig::default())
    }

    /// Create an empty stack with explicit settings
    pub fn with_config(components: ComponentRegistry, config: EngineConfig) -> Self {
        Self {
            components: Rc::new(components),
            factories: HashMap::new(),
            scenes: Vec::new(),
            config,
        }
    }

    /// Install the logger using the configured filter
    pub fn init_logging(&self) {
        logging::init_with_filter(&self.config.log_filter);
    }

    /// Settings applied to pushed scenes
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Component catalog shared by every scene
    pub fn components(&self) -> &Rc<ComponentRegistry> {
        &self.components
    }

    /// Register scene logic under `name`
    pub fn register_scene<L: SceneLogic + 'static>(
        &mut self,
        name: &str,
        factory: impl Fn() -> L + 'static,
    ) -> EcsResult<()> {
        if self.factories.contains_key(name) {
            return Err(EcsError::duplicate("scene", name));
        }
        self.factories
            .insert(name.to_string(), Box::new(move || Box::new(factory()) as Box<dyn SceneLogic>));
        Ok(())
    }

    /// Sorted names of the registered scenes
    pub fn scene_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Create the scene registered as `name` and make it the top
    ///
    /// The previous top is suspended first. If the new scene fails to
    /// create, it is destroyed and the previous top resumes.
    pub fn push(&mut self, name: &str) -> EcsResult<()> {
        let factory = self.factories.get(name).ok_or_else(|| EcsError::not_found("scene", name))?;
        let mut scene = Scene::with_config(name, Rc::clone(&self.components), factory(), self.config.scene.clone());

        let suspended = match self.scenes.last_mut() {
            Some(top) if top.state() == SceneState::Running => {
                top.suspend()?;
                true
            }
            _ => false,
        };

        if let Err(err) = scene.create() {
            let _ = scene.destroy();
            if suspended {
                if let Some(top) = self.scenes.last_mut() {
                    top.resume()?;
                }
            }
            return Err(err);
        }

        log::info!("Pushed scene '{}' (depth {})", name, self.scenes.len() + 1);
        self.scenes.push(scene);
        Ok(())
    }

    /// Destroy the top scene and resume the one below it
    pub fn pop(&mut self) -> EcsResult<()> {
        let mut scene = self
            .scenes
            .pop()
            .ok_or_else(|| EcsError::InvalidState("scene stack is empty".to_string()))?;
        if scene.state() != SceneState::Destroyed {
            scene.destroy()?;
        }
        log::info!("Popped scene '{}'", scene.name());

        if let Some(top) = self.scenes.last_mut() {
            if top.state() == SceneState::Suspended {
                top.resume()?;
            }
        }
        Ok(())
    }

    /// Destroy every scene, top first
    pub fn clear(&mut self) {
        while let Some(mut scene) = self.scenes.pop() {
            if scene.state() != SceneState::Destroyed {
                let _ = scene.destroy();
            }
        }
    }

    /// Tick the top scene
    pub fn process(&mut self, delta_time: f32) -> EcsResult<()> {
        self.scenes
            .last_mut()
            .ok_or_else(|| EcsError::InvalidState("scene stack is empty".to_string()))?
            .update(delta_time)
    }

    /// Top scene
    pub fn current(&self) -> Option<&Scene> {
        self.scenes.last()
    }

    /// Top scene, mutably
    pub fn current_mut(&mut self) -> Option<&mut Scene> {
        self.scenes.last_mut()
    }

    /// Number of stacked scenes
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Whether no scene is stacked
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

impl Drop for SceneStack {
    fn drop(&mut self) {
        self.clear();
    }
}
