//! Fixed-rate simulation driver.
//!
//! The driver wraps exactly one [`World`] for its whole lifetime and is the
//! only component that calls the world's tick entry point; all physics policy
//! stays inside the world. The server's main loop fires [`Simulation::step`]
//! at a fixed cadence and broadcasts after each completed tick.

use crate::world::World;

/// Tick driver state machine: created Stopped, Running once the server loop
/// starts firing it, and Running/Paused via [`Simulation::toggle_pause`].
#[derive(Debug)]
pub struct Simulation {
    world: World,
    /// Ticks per simulated second, fixed at construction.
    divisor: f32,
    paused: bool,
}

impl Simulation {
    /// Binds the driver to one world. The driver never rebinds.
    pub fn new(world: World, divisor: f32) -> Self {
        Self {
            world,
            divisor,
            paused: false,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Flips between Running and Paused. Returns true when now paused.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Advances the world by one tick unless paused.
    ///
    /// Returns true when a tick actually ran, so the caller can distinguish
    /// a completed tick from a paused no-op.
    pub fn step(&mut self) -> bool {
        if self.paused {
            return false;
        }
        self.world.step(self.divisor);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Vec2, TICKS_PER_SECOND};

    fn simulation() -> Simulation {
        Simulation::new(World::new(1024.0, 1024.0), TICKS_PER_SECOND)
    }

    #[test]
    fn test_step_advances_tick_counter() {
        let mut sim = simulation();
        assert!(sim.step());
        assert!(sim.step());
        assert_eq!(sim.world().tick, 2);
    }

    #[test]
    fn test_paused_step_is_noop() {
        let mut sim = simulation();
        sim.world_mut()
            .add_ball(1.0, 10.0, Vec2::new(100.0, 100.0), Vec2::new(50.0, 0.0));

        assert!(sim.toggle_pause());
        assert!(!sim.step());

        assert_eq!(sim.world().tick, 0);
        let ball = &sim.world().balls()[0];
        assert_eq!(ball.position, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_toggle_pause_round_trip() {
        let mut sim = simulation();
        assert!(!sim.is_paused());
        assert!(sim.toggle_pause());
        assert!(!sim.toggle_pause());
        assert!(sim.step());
    }
}
