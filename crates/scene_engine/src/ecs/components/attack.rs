//! Attack Random Enemy Behaviour
//!
//! Each update hits one randomly chosen other entity of the scene.

use super::HealthAttribute;
use crate::ecs::{Behaviour, EntityHandle};
use crate::error::EcsResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deals up to `max_damage` to a random other entity every update
#[derive(Debug, Clone)]
pub struct AttackRandomEnemyBehaviour {
    max_damage: f32,
    rng: StdRng,
}

impl AttackRandomEnemyBehaviour {
    /// Damage used by [`Default`]
    pub const DEFAULT_MAX_DAMAGE: f32 = 10.0;

    /// Attack with entropy-seeded randomness
    pub fn new(max_damage: f32) -> Self {
        Self {
            max_damage,
            rng: StdRng::from_entropy(),
        }
    }

    /// Attack with a fixed seed, for reproducible runs
    pub fn seeded(max_damage: f32, seed: u64) -> Self {
        Self {
            max_damage,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Upper bound of a single hit
    pub fn max_damage(&self) -> f32 {
        self.max_damage
    }
}

impl Default for AttackRandomEnemyBehaviour {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DAMAGE)
    }
}

impl Behaviour for AttackRandomEnemyBehaviour {
    fn update(&mut self, owner: &EntityHandle, _delta_time: f32) -> EcsResult<()> {
        let entities = owner.scene()?.entities()?;
        if entities.len() < 2 {
            return Ok(());
        }

        let target = entities.pick_other(owner, &mut self.rng)?;
        // Dead or unarmoured targets are skipped, not treated as failures
        if !target.alive() || !target.has_attribute::<HealthAttribute>() {
            return Ok(());
        }

        let damage = self.rng.gen::<f32>() * self.max_damage;
        log::trace!("{:?} hits {:?} for {:.1}", owner.id(), target.id(), damage);
        target.with_attribute(|health: &mut HealthAttribute| health.decrease(damage))?;
        Ok(())
    }
}
