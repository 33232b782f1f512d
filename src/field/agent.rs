//! Agents and the box they bounce around in.

use rand::Rng;

use crate::render::Point;

/// Size of the simulation area, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    /// Non-finite or negative sizes collapse to 0.
    pub fn new(width: f32, height: f32) -> Self {
        let sanitize = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            width: sanitize(width),
            height: sanitize(height),
        }
    }

    /// Check if a point lies inside, edges included.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}

/// One moving point of the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    /// Position in the batch; selects the spectrum bin and colour band
    pub index: u32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Agent {
    /// Random position inside `bounds`, random heading, speed in `[0.5, 1)`.
    pub fn spawn(index: u32, bounds: Bounds, rng: &mut impl Rng) -> Self {
        let angle = rng.random::<f32>() * std::f32::consts::TAU;
        let speed = rng.random_range(0.5f32..1.0);
        Self {
            index,
            x: rng.random::<f32>() * bounds.width,
            y: rng.random::<f32>() * bounds.height,
            vx: angle.cos() * speed,
            vy: angle.sin() * speed,
        }
    }

    /// Get the agent's position.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Move by `velocity * speed`, bouncing off the walls.
    ///
    /// A component that leaves `[0, size]` is clamped back onto the wall and
    /// its velocity turned to point inward.
    pub fn advance(&mut self, speed: f32, bounds: Bounds) {
        (self.x, self.vx) = bounce(self.x + self.vx * speed, self.vx, bounds.width);
        (self.y, self.vy) = bounce(self.y + self.vy * speed, self.vy, bounds.height);
    }
}

fn bounce(pos: f32, vel: f32, size: f32) -> (f32, f32) {
    if pos < 0.0 {
        (0.0, vel.abs())
    } else if pos > size {
        (size, -vel.abs())
    } else if pos.is_nan() {
        (0.0, vel)
    } else {
        (pos, vel)
    }
}
