//! Multi-module tick scenarios

mod event_integration;

use crate::ecs::components::register_builtins;
use crate::ecs::ComponentRegistry;
use crate::scene::{EmptyScene, Scene};
use std::rc::Rc;

/// A created scene with the built-in components registered
fn running_scene() -> Scene {
    let mut registry = ComponentRegistry::new();
    register_builtins(&mut registry).unwrap();
    let mut scene = Scene::new("test", Rc::new(registry), Box::new(EmptyScene));
    scene.create().unwrap();
    scene
}
