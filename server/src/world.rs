//! Authoritative world state: the ball collection, the global simulation
//! parameters and the per-tick physics advance.

use log::info;
use rand::Rng;
use shared::{
    collide, collide_world_bounds, is_colliding, Ball, Vec2, EPSILON, GRAVITY, RESTITUTION,
};

/// The single source of truth for all physical state.
///
/// Balls are stored in insertion order; each unordered pair {i,j} with i < j
/// is resolved at most once per tick. All simulation parameters live here as
/// explicit fields rather than process-wide globals, so independent worlds
/// (and tests) cannot interfere with each other.
#[derive(Debug)]
pub struct World {
    balls: Vec<Ball>,
    /// Next ball id. Monotonic, never reused for the lifetime of the world.
    next_ball_id: u32,
    /// World width in world units.
    pub width: f32,
    /// World height in world units.
    pub height: f32,
    /// Acceleration applied along +y every simulated second. 0 when toggled off.
    pub gravity: f32,
    /// Fraction of relative velocity retained on impact. 0 when toggled off.
    pub restitution: f32,
    /// Whether pairwise collision detection runs at all.
    pub collisions_enabled: bool,
    /// Monotonic count of completed physics ticks.
    pub tick: u64,
}

impl World {
    /// Creates an empty world with the default simulation parameters.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            balls: Vec::new(),
            next_ball_id: 1,
            width,
            height,
            gravity: GRAVITY,
            restitution: RESTITUTION,
            collisions_enabled: true,
            tick: 0,
        }
    }

    /// Adds a ball and returns its freshly assigned id.
    ///
    /// Physical validation (mass > 0, radius >= 0) happens at the protocol
    /// boundary before this is called.
    pub fn add_ball(&mut self, mass: f32, radius: f32, position: Vec2, velocity: Vec2) -> u32 {
        let id = self.next_ball_id;
        self.next_ball_id += 1;

        self.balls
            .push(Ball::new(id, mass, radius, position, velocity));
        info!("Added ball {} at ({}, {})", id, position.x, position.y);
        id
    }

    /// Removes a ball by id. Returns false when the id references no live
    /// ball, which callers treat as a no-op rather than an error.
    pub fn remove_ball(&mut self, id: u32) -> bool {
        let before = self.balls.len();
        self.balls.retain(|ball| ball.id != id);

        let removed = self.balls.len() < before;
        if removed {
            info!("Removed ball {}", id);
        }
        removed
    }

    /// Looks up a ball by id.
    pub fn ball(&self, id: u32) -> Option<&Ball> {
        self.balls.iter().find(|ball| ball.id == id)
    }

    /// All balls in insertion order.
    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    /// Mutable view of the balls, used by the broadcast pass to consume
    /// dirty flags.
    pub fn balls_mut(&mut self) -> &mut [Ball] {
        &mut self.balls
    }

    /// Returns the number of balls in the world.
    pub fn len(&self) -> usize {
        self.balls.len()
    }

    /// Returns true when the world holds no balls.
    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    /// Advances the simulation by one tick.
    ///
    /// `divisor` is the number of ticks per simulated second, decoupling the
    /// physics scale from the wall-clock tick rate. The phase ordering is
    /// integrate, then pairwise resolution, then boundary clamping: the final
    /// clamp corrects any overshoot the earlier phases introduced within the
    /// same tick, so a ball cannot tunnel through a world edge.
    pub fn step(&mut self, divisor: f32) {
        let inv_divisor = 1.0 / divisor;
        let apply_gravity = self.gravity.abs() > EPSILON;

        for ball in &mut self.balls {
            if apply_gravity {
                ball.velocity.y += self.gravity * inv_divisor;
                ball.mark_dirty();
            }

            // Deadband: sub-epsilon components are treated as zero so settled
            // balls stop generating updates.
            if ball.velocity.x.abs() < EPSILON {
                ball.velocity.x = 0.0;
            }
            if ball.velocity.y.abs() < EPSILON {
                ball.velocity.y = 0.0;
            }

            if ball.velocity.x != 0.0 || ball.velocity.y != 0.0 {
                ball.position = ball.position.add(&ball.velocity.scale(inv_divisor));
                ball.mark_dirty();
            }
        }

        if self.collisions_enabled {
            for i in 0..self.balls.len() {
                for j in (i + 1)..self.balls.len() {
                    let (head, tail) = self.balls.split_at_mut(j);
                    let a = &mut head[i];
                    let b = &mut tail[0];

                    if is_colliding(a, b) {
                        collide(a, b, self.restitution);
                    }
                }
            }
        }

        for ball in &mut self.balls {
            collide_world_bounds(ball, self.width, self.height, self.restitution);
        }

        self.tick += 1;
    }

    /// Moves every ball to an independent uniform-random in-bounds position.
    pub fn scatter<R: Rng>(&mut self, rng: &mut R) {
        for ball in &mut self.balls {
            let max_x = (self.width - ball.radius).max(ball.radius);
            let max_y = (self.height - ball.radius).max(ball.radius);

            ball.position = Vec2::new(
                rng.gen_range(ball.radius..=max_x),
                rng.gen_range(ball.radius..=max_y),
            );
            ball.mark_dirty();
        }
    }

    /// Zeroes every ball's velocity, marking only the ones that were moving.
    pub fn zero_velocities(&mut self) {
        for ball in &mut self.balls {
            if ball.velocity.x != 0.0 || ball.velocity.y != 0.0 {
                ball.velocity = Vec2::default();
                ball.mark_dirty();
            }
        }
    }

    /// Toggles gravity between 0 and the default magnitude. Returns the new
    /// value.
    pub fn toggle_gravity(&mut self) -> f32 {
        self.gravity = if self.gravity.abs() > EPSILON {
            0.0
        } else {
            GRAVITY
        };
        self.gravity
    }

    /// Toggles restitution between 0 and the default elastic value. Returns
    /// the new value.
    pub fn toggle_restitution(&mut self) -> f32 {
        self.restitution = if self.restitution.abs() > EPSILON {
            0.0
        } else {
            RESTITUTION
        };
        self.restitution
    }

    /// Toggles pairwise collision detection. Returns the new state.
    pub fn toggle_collisions(&mut self) -> bool {
        self.collisions_enabled = !self.collisions_enabled;
        self.collisions_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::TICKS_PER_SECOND;

    fn quiet_world() -> World {
        let mut world = World::new(1024.0, 1024.0);
        world.gravity = 0.0;
        world
    }

    #[test]
    fn test_ids_are_monotonic_and_never_reused() {
        let mut world = quiet_world();
        let a = world.add_ball(1.0, 10.0, Vec2::new(100.0, 100.0), Vec2::default());
        let b = world.add_ball(1.0, 10.0, Vec2::new(200.0, 100.0), Vec2::default());
        assert!(b > a);

        world.remove_ball(a);
        let c = world.add_ball(1.0, 10.0, Vec2::new(300.0, 100.0), Vec2::default());
        assert!(c > b);
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut world = quiet_world();
        world.add_ball(1.0, 10.0, Vec2::new(100.0, 100.0), Vec2::default());

        assert!(!world.remove_ball(9999));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_step_integrates_velocity() {
        let mut world = quiet_world();
        let id = world.add_ball(1.0, 10.0, Vec2::new(100.0, 100.0), Vec2::new(60.0, 0.0));

        world.step(TICKS_PER_SECOND);

        let ball = world.ball(id).unwrap();
        assert_approx_eq!(ball.position.x, 101.0);
        assert_approx_eq!(ball.position.y, 100.0);
        assert_eq!(world.tick, 1);
    }

    #[test]
    fn test_step_applies_gravity() {
        let mut world = World::new(1024.0, 1024.0);
        let id = world.add_ball(1.0, 10.0, Vec2::new(100.0, 100.0), Vec2::default());

        world.step(TICKS_PER_SECOND);

        let ball = world.ball(id).unwrap();
        assert_approx_eq!(ball.velocity.y, GRAVITY / TICKS_PER_SECOND, 0.001);
        assert!(ball.position.y > 100.0);
    }

    #[test]
    fn test_gravity_fall_and_bounce() {
        let mut world = World::new(1024.0, 1024.0);
        let id = world.add_ball(1.0, 10.0, Vec2::new(100.0, 100.0), Vec2::default());

        let mut last_y = 100.0;
        let mut bounced = false;

        for _ in 0..2000 {
            world.step(TICKS_PER_SECOND);
            let ball = world.ball(id).unwrap();

            if ball.velocity.y < 0.0 {
                bounced = true;
                break;
            }

            // Strictly falling until the floor contact.
            assert!(ball.position.y > last_y);
            last_y = ball.position.y;
        }

        assert!(bounced, "ball never reached the floor");
        let ball = world.ball(id).unwrap();
        assert!(ball.position.y <= 1024.0 - ball.radius + EPSILON);
    }

    #[test]
    fn test_step_resolves_overlapping_pair() {
        let mut world = quiet_world();
        let a = world.add_ball(1.0, 10.0, Vec2::new(100.0, 100.0), Vec2::default());
        let b = world.add_ball(1.0, 10.0, Vec2::new(112.0, 100.0), Vec2::default());

        world.step(TICKS_PER_SECOND);

        let a = world.ball(a).unwrap().clone();
        let b = world.ball(b).unwrap().clone();
        let distance = a.position.sub(&b.position).magnitude();
        assert!(distance >= a.radius + b.radius - EPSILON);
    }

    #[test]
    fn test_step_skips_pairs_when_collisions_disabled() {
        let mut world = quiet_world();
        let a = world.add_ball(1.0, 10.0, Vec2::new(100.0, 100.0), Vec2::default());
        let b = world.add_ball(1.0, 10.0, Vec2::new(112.0, 100.0), Vec2::default());
        world.toggle_collisions();

        world.step(TICKS_PER_SECOND);

        assert_approx_eq!(world.ball(a).unwrap().position.x, 100.0);
        assert_approx_eq!(world.ball(b).unwrap().position.x, 112.0);
    }

    #[test]
    fn test_scatter_stays_in_bounds() {
        let mut world = quiet_world();
        for i in 0..20 {
            world.add_ball(1.0, 10.0, Vec2::new(i as f32, 0.0), Vec2::default());
        }

        let mut rng = rand::thread_rng();
        world.scatter(&mut rng);

        for ball in world.balls_mut() {
            assert!(ball.position.x >= ball.radius);
            assert!(ball.position.x <= 1024.0 - ball.radius);
            assert!(ball.position.y >= ball.radius);
            assert!(ball.position.y <= 1024.0 - ball.radius);
            assert!(ball.take_dirty());
        }
    }

    #[test]
    fn test_zero_velocities_marks_only_moving_balls() {
        let mut world = quiet_world();
        let moving = world.add_ball(1.0, 10.0, Vec2::new(100.0, 100.0), Vec2::new(5.0, 5.0));
        let still = world.add_ball(1.0, 10.0, Vec2::new(200.0, 100.0), Vec2::default());

        world.zero_velocities();

        let moving_idx = world.balls().iter().position(|b| b.id == moving).unwrap();
        let still_idx = world.balls().iter().position(|b| b.id == still).unwrap();
        assert!(world.balls_mut()[moving_idx].take_dirty());
        assert!(!world.balls_mut()[still_idx].take_dirty());
        assert_eq!(world.ball(moving).unwrap().velocity, Vec2::default());
    }

    #[test]
    fn test_toggles_flip_between_zero_and_default() {
        let mut world = World::new(1024.0, 1024.0);

        assert_approx_eq!(world.toggle_gravity(), 0.0);
        assert_approx_eq!(world.toggle_gravity(), GRAVITY);

        assert_approx_eq!(world.toggle_restitution(), 0.0);
        assert_approx_eq!(world.toggle_restitution(), RESTITUTION);

        assert!(!world.toggle_collisions());
        assert!(world.toggle_collisions());
    }
}
