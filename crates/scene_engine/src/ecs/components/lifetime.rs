//! Lifetime Behaviour
//!
//! Destroys its entity once a fixed duration has elapsed.

use crate::ecs::{Behaviour, EntityHandle};
use crate::error::EcsResult;

/// Removes the owner after `duration` seconds of updates
#[derive(Debug, Clone, Copy, Default)]
pub struct LifetimeBehaviour {
    /// How long the entity should live (in seconds); `<= 0` lives forever
    pub duration: f32,
    /// Time accumulated since the behaviour was attached
    pub elapsed: f32,
}

impl LifetimeBehaviour {
    /// Create a new lifetime
    pub fn new(duration: f32) -> Self {
        Self { duration, elapsed: 0.0 }
    }

    /// Check if the lifetime has expired
    pub fn is_expired(&self) -> bool {
        if self.duration <= 0.0 {
            false // Infinite lifetime
        } else {
            self.elapsed >= self.duration
        }
    }

    /// Get remaining lifetime in seconds
    pub fn remaining(&self) -> f32 {
        if self.duration <= 0.0 {
            f32::INFINITY
        } else {
            (self.duration - self.elapsed).max(0.0)
        }
    }
}

impl Behaviour for LifetimeBehaviour {
    fn update(&mut self, owner: &EntityHandle, delta_time: f32) -> EcsResult<()> {
        self.elapsed += delta_time;
        if self.is_expired() && owner.destroy() {
            log::debug!("Lifetime of {:?} expired after {}s", owner.id(), self.elapsed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lifetime_not_expired() {
        let lifetime = LifetimeBehaviour { duration: 5.0, elapsed: 2.0 };
        assert!(!lifetime.is_expired());
    }

    #[test]
    fn test_lifetime_expired() {
        let lifetime = LifetimeBehaviour { duration: 5.0, elapsed: 6.0 };
        assert!(lifetime.is_expired());
    }

    #[test]
    fn test_infinite_lifetime() {
        let lifetime = LifetimeBehaviour { duration: 0.0, elapsed: 1000.0 };
        assert!(!lifetime.is_expired());
        assert!(lifetime.remaining().is_infinite());
    }

    #[test]
    fn test_remaining_time() {
        let mut lifetime = LifetimeBehaviour::new(10.0);
        lifetime.elapsed = 3.0;
        assert_relative_eq!(lifetime.remaining(), 7.0);
        lifetime.elapsed = 12.0;
        assert_relative_eq!(lifetime.remaining(), 0.0);
    }
}
