//! Scenes and the scene stack
//!
//! A [`Scene`] owns its entities, systems and scene-wide event bus. Code
//! running inside a tick reaches the scene through a [`SceneRef`], which
//! never keeps the scene alive on its own.

pub(crate) mod context;
mod lifecycle;
mod scene_stack;

pub use context::SceneRef;
pub use lifecycle::{EmptyScene, Scene, SceneLogic, SceneState, SceneStats};
pub use scene_stack::SceneStack;
