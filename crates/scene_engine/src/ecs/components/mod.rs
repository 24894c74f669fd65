//! Built-in components
//!
//! Ready-made attributes, behaviours and systems, plus
//! [`register_builtins`] to make them constructible by name.

pub mod attack;
pub mod census;
pub mod health;
pub mod lifetime;
pub mod timer;

pub use attack::AttackRandomEnemyBehaviour;
pub use census::CensusSystem;
pub use health::{EntityDiedEvent, HealthAttribute};
pub use lifetime::LifetimeBehaviour;
pub use timer::TimerBehaviour;

use super::ComponentRegistry;
use crate::error::EcsResult;

/// Register every built-in component under its type name
pub fn register_builtins(registry: &mut ComponentRegistry) -> EcsResult<()> {
    registry.register_attribute("HealthAttribute", HealthAttribute::default)?;
    registry.register_behaviour("TimerBehaviour", TimerBehaviour::default)?;
    registry.register_behaviour("LifetimeBehaviour", LifetimeBehaviour::default)?;
    registry.register_behaviour("AttackRandomEnemyBehaviour", AttackRandomEnemyBehaviour::default)?;
    registry.register_system("CensusSystem", CensusSystem::default)?;
    registry.register_event("EntityDiedEvent", EntityDiedEvent::default)?;
    Ok(())
}
