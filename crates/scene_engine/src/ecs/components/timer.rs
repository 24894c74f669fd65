//! Timer Behaviour
//!
//! Accumulates the time its entity has been updated for.

use crate::ecs::{Behaviour, EntityHandle};
use crate::error::EcsResult;

/// Accumulated update time in seconds
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerBehaviour {
    elapsed: f32,
}

impl TimerBehaviour {
    /// Create a timer at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds accumulated so far
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Restart from zero
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

impl Behaviour for TimerBehaviour {
    fn update(&mut self, _owner: &EntityHandle, delta_time: f32) -> EcsResult<()> {
        self.elapsed += delta_time;
        log::trace!("{} seconds have elapsed", self.elapsed);
        Ok(())
    }
}
