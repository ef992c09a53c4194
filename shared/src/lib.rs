//! Shared simulation primitives for the ball physics server.
//!
//! This crate holds everything both the server and headless clients need to
//! agree on: the 2D vector math, the [`Ball`] entity with its collision
//! response, the global simulation defaults, and the text wire protocol
//! ([`protocol`]). The server owns the authoritative state; clients only ever
//! see formatted copies of it.

pub mod protocol;

/// Default world width in world units.
pub const WORLD_WIDTH: f32 = 1024.0;
/// Default world height in world units.
pub const WORLD_HEIGHT: f32 = 1024.0;
/// Default gravity acceleration (world units per second squared, +y is down).
pub const GRAVITY: f32 = 980.0;
/// Default restitution: fraction of relative velocity retained on impact.
pub const RESTITUTION: f32 = 0.85;
/// Default time divisor: simulation ticks per simulated second.
pub const TICKS_PER_SECOND: f32 = 60.0;
/// Shared near-zero tolerance for all physics math. Every component uses this
/// same constant so results stay deterministic across call sites.
pub const EPSILON: f32 = 1e-5;

/// Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    /// Value along the x-axis. Positive direction is to the right.
    pub x: f32,
    /// Value along the y-axis. Positive direction is down.
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Vec2 {
        Vec2 { x, y }
    }

    /// Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the normalized vector, or the zero vector when the magnitude
    /// is within [`EPSILON`] of zero.
    pub fn normalize(&self) -> Vec2 {
        let mag = self.magnitude();
        if mag < EPSILON {
            Vec2 { x: 0.0, y: 0.0 }
        } else {
            Vec2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    /// Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec2 {
        Vec2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    /// Returns the sum of two vectors.
    pub fn add(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Returns the difference of two vectors.
    pub fn sub(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Returns the dot product of two vectors.
    pub fn dot(&self, other: &Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }
}

/// A circular rigid body.
///
/// Balls are exclusively owned by the server's world; everything a client
/// learns about one travels as a formatted protocol line. The dirty flag
/// tracks unbroadcast position/velocity changes and has read-and-clear
/// semantics: exactly one reader (the broadcast pass) consumes it.
#[derive(Debug, Clone)]
pub struct Ball {
    /// Unique identifier, assigned monotonically at creation and stable for
    /// the ball's lifetime.
    pub id: u32,
    /// Mass in arbitrary units. Strictly positive; the reciprocal drives the
    /// collision response, so zero mass is rejected at the protocol boundary.
    pub mass: f32,
    /// Radius in world units, >= 0.
    pub radius: f32,
    /// Center position.
    pub position: Vec2,
    /// Velocity in world units per second.
    pub velocity: Vec2,
    dirty: bool,
}

impl Ball {
    /// Creates a ball with the given physical properties.
    ///
    /// Validation of mass and radius happens before construction; a fresh
    /// ball starts clean because its creation is announced structurally.
    pub fn new(id: u32, mass: f32, radius: f32, position: Vec2, velocity: Vec2) -> Self {
        Self {
            id,
            mass,
            radius,
            position,
            velocity,
            dirty: false,
        }
    }

    /// Reciprocal of the mass, used to distribute collision response so
    /// heavier bodies move less.
    pub fn inv_mass(&self) -> f32 {
        1.0 / self.mass
    }

    /// Flags the ball as changed since the last broadcast.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Reads and clears the dirty flag in one step.
    ///
    /// Returns true at most once per dirty transition regardless of how many
    /// mutations happened in between.
    pub fn take_dirty(&mut self) -> bool {
        let was_dirty = self.dirty;
        self.dirty = false;
        was_dirty
    }

    /// Returns the dirty flag without clearing it.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Returns true iff the squared center distance is within the combined radii.
/// Pure and symmetric.
pub fn is_colliding(a: &Ball, b: &Ball) -> bool {
    let delta = a.position.sub(&b.position);
    let combined = a.radius + b.radius;
    delta.dot(&delta) <= combined * combined
}

/// Resolves an overlapping pair: separates the bodies positionally
/// (distributed by inverse mass) and, if they are closing, applies a
/// restitution-scaled impulse along the collision normal.
pub fn collide(a: &mut Ball, b: &mut Ball, restitution: f32) {
    let combined = a.radius + b.radius;
    let delta = a.position.sub(&b.position);
    let distance = delta.magnitude();

    // Exactly coincident centers give no usable normal; substitute a
    // horizontal separation of the combined radius.
    let (normal, penetration) = if distance < EPSILON {
        (Vec2::new(1.0, 0.0), combined)
    } else {
        (delta.scale(1.0 / distance), combined - distance)
    };

    let inv_a = a.inv_mass();
    let inv_b = b.inv_mass();
    let inv_sum = inv_a + inv_b;
    if penetration > 0.0 {
        let correction = normal.scale(penetration / inv_sum);
        a.position = a.position.add(&correction.scale(inv_a));
        b.position = b.position.sub(&correction.scale(inv_b));
    }

    a.mark_dirty();
    b.mark_dirty();

    let relative = a.velocity.sub(&b.velocity);
    let closing = relative.dot(&normal);

    // Bodies already separating: positional correction only, no impulse.
    if closing > -EPSILON {
        return;
    }

    let mut impulse = -(1.0 + restitution) * closing / inv_sum;
    if impulse.is_nan() {
        impulse = 0.0;
    }

    a.velocity = a.velocity.add(&normal.scale(impulse * inv_a));
    b.velocity = b.velocity.sub(&normal.scale(impulse * inv_b));
}

/// Clamps a ball back inside the `[0,width]x[0,height]` rectangle.
///
/// On contact the perpendicular velocity component is negated and scaled by
/// restitution while the parallel component is scaled by restitution as well,
/// which damps sliding along a wall.
pub fn collide_world_bounds(ball: &mut Ball, width: f32, height: f32, restitution: f32) {
    if ball.position.x - ball.radius < 0.0 {
        ball.position.x = ball.radius;
        ball.velocity.x = -ball.velocity.x * restitution;
        ball.velocity.y *= restitution;
        ball.mark_dirty();
    } else if ball.position.x + ball.radius > width {
        ball.position.x = width - ball.radius;
        ball.velocity.x = -ball.velocity.x * restitution;
        ball.velocity.y *= restitution;
        ball.mark_dirty();
    }

    if ball.position.y - ball.radius < 0.0 {
        ball.position.y = ball.radius;
        ball.velocity.y = -ball.velocity.y * restitution;
        ball.velocity.x *= restitution;
        ball.mark_dirty();
    } else if ball.position.y + ball.radius > height {
        ball.position.y = height - ball.radius;
        ball.velocity.y = -ball.velocity.y * restitution;
        ball.velocity.x *= restitution;
        ball.mark_dirty();
    }
}
