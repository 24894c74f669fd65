//! # Scene Engine
//!
//! The scene core of an Entity-Component-System game engine.
//!
//! ## Features
//!
//! - **Scenes**: Lifecycle-managed containers of entities and systems
//! - **Components**: Data attributes and per-tick behaviours, by type or by name
//! - **Deferred Destruction**: Entities can be destroyed safely mid-tick
//! - **Event Bus**: Typed publish/subscribe with weak, token-owned subscriptions
//! - **Scene Stack**: Push and pop scenes with suspend/resume
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! struct Arena;
//!
//! impl SceneLogic for Arena {
//!     fn create(&mut self, scene: &SceneRef) -> EcsResult<()> {
//!         for name in ["red", "blue"] {
//!             let fighter = scene.create_entity(name)?;
//!             fighter.create_attribute("HealthAttribute")?;
//!             fighter.create_behaviour("AttackRandomEnemyBehaviour")?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut components = ComponentRegistry::new();
//!     register_builtins(&mut components)?;
//!
//!     let mut stack = SceneStack::new(components);
//!     stack.init_logging();
//!     stack.register_scene("arena", || Arena)?;
//!     stack.push("arena")?;
//!
//!     for _ in 0..60 {
//!         stack.process(1.0 / 60.0)?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod config;
pub mod ecs;
pub mod events;
pub mod foundation;
pub mod scene;

mod error;

pub use error::{EcsError, EcsResult};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, EngineConfig, SceneConfig},
        ecs::{
            components::{
                register_builtins, AttackRandomEnemyBehaviour, CensusSystem, EntityDiedEvent, HealthAttribute,
                LifetimeBehaviour, TimerBehaviour,
            },
            Attribute, Behaviour, ComponentRegistry, EntityHandle, EntityId, EntitySet, System,
        },
        events::{Event, EventBus, SubscriptionToken},
        scene::{EmptyScene, Scene, SceneLogic, SceneRef, SceneStack, SceneState, SceneStats},
        EcsError, EcsResult,
    };
}
