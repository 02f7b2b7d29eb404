//! # SKIRMISH Physics
//!
//! Kinematic top-down movement against static obstacles.
//!
//! Features:
//! - Velocity integration, clamped to the arena
//! - AABB overlap resolution by minimum translation vector
//! - Free spawn point search

use rand::Rng;
use skirmish_shared::{Vec2, WorldConfig};

/// Overlaps closer than this count as equal when picking the MTV axis.
pub const EPSILON: f32 = 1e-3;

/// Attempts at finding a free spawn point before falling back to the centre.
pub const SPAWN_ATTEMPTS: usize = 32;

// ============================================================================
// AABB (Axis-Aligned Bounding Box)
// ============================================================================

/// Axis-aligned box in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec2,
    /// Maximum corner.
    pub max: Vec2,
}

impl Aabb {
    /// Creates a box from its corners.
    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a box centred at `center`.
    #[must_use]
    pub fn from_center(center: Vec2, width: f32, height: f32) -> Self {
        let half = Vec2::new(width * 0.5, height * 0.5);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Creates a box from its top-left corner and size.
    #[must_use]
    pub fn from_corner(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + width, y + height),
        }
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// True if the interiors overlap. Touching edges do not count.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Overlap on each axis. Positive = overlap, negative = gap.
    #[must_use]
    pub fn overlap(&self, other: &Self) -> Vec2 {
        Vec2::new(
            self.max.x.min(other.max.x) - self.min.x.max(other.min.x),
            self.max.y.min(other.max.y) - self.min.y.max(other.min.y),
        )
    }

    /// Smallest displacement that moves `self` out of `other`.
    ///
    /// Resolves along the axis of smaller overlap. Ties and near-ties go
    /// to X. `None` if the boxes do not overlap.
    #[must_use]
    pub fn mtv(&self, other: &Self) -> Option<Vec2> {
        let overlap = self.overlap(other);
        if overlap.x <= 0.0 || overlap.y <= 0.0 {
            return None;
        }
        let (a, b) = (self.center(), other.center());
        if overlap.x <= overlap.y + EPSILON {
            let sign = if a.x < b.x { -1.0 } else { 1.0 };
            Some(Vec2::new(sign * overlap.x, 0.0))
        } else {
            let sign = if a.y < b.y { -1.0 } else { 1.0 };
            Some(Vec2::new(0.0, sign * overlap.y))
        }
    }

    /// Moves the box by `delta`.
    #[must_use]
    pub fn translate(&self, delta: Vec2) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }
}

// ============================================================================
// ARENA
// ============================================================================

/// The arena: bounds, player hitbox and static obstacles.
#[derive(Clone, Debug, PartialEq)]
pub struct Arena {
    width: f32,
    height: f32,
    player_size: Vec2,
    obstacles: Vec<Aabb>,
}

impl Arena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new(width: f32, height: f32, player_width: f32, player_height: f32) -> Self {
        Self {
            width,
            height,
            player_size: Vec2::new(player_width, player_height),
            obstacles: Vec::new(),
        }
    }

    /// Builds the arena described by the world configuration.
    #[must_use]
    pub fn from_config(world: &WorldConfig) -> Self {
        let mut arena = Self::new(world.width, world.height, world.player_width, world.player_height);
        for obstacle in &world.obstacles {
            arena.add_obstacle(Aabb::from_corner(obstacle.x, obstacle.y, obstacle.width, obstacle.height));
        }
        arena
    }

    /// Adds a static obstacle.
    pub fn add_obstacle(&mut self, obstacle: Aabb) {
        self.obstacles.push(obstacle);
    }

    /// Static obstacles.
    #[must_use]
    pub fn obstacles(&self) -> &[Aabb] {
        &self.obstacles
    }

    /// Arena centre.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Hitbox of a player standing at `position`.
    #[must_use]
    pub fn hitbox(&self, position: Vec2) -> Aabb {
        Aabb::from_center(position, self.player_size.x, self.player_size.y)
    }

    /// Keeps a player's hitbox inside the arena.
    #[must_use]
    pub fn clamp(&self, position: Vec2) -> Vec2 {
        let half = self.player_size * 0.5;
        Vec2::new(
            clamp_axis(position.x, half.x, self.width - half.x),
            clamp_axis(position.y, half.y, self.height - half.y),
        )
    }

    /// True if a player at `position` overlaps any obstacle.
    #[must_use]
    pub fn is_blocked(&self, position: Vec2) -> bool {
        let hitbox = self.hitbox(position);
        self.obstacles.iter().any(|obstacle| hitbox.intersects(obstacle))
    }

    /// Pushes a player out of every obstacle it overlaps.
    #[must_use]
    pub fn resolve(&self, position: Vec2) -> Vec2 {
        let mut position = position;
        for obstacle in &self.obstacles {
            if let Some(push) = self.hitbox(position).mtv(obstacle) {
                position += push;
            }
        }
        position
    }

    /// Advances one player by `velocity * dt`, then clamps and resolves.
    #[must_use]
    pub fn step(&self, position: Vec2, velocity: Vec2, dt: f32) -> Vec2 {
        let moved = self.clamp(position + velocity * dt);
        self.clamp(self.resolve(moved))
    }

    /// A random position whose hitbox is inside the arena and clear of
    /// obstacles. Falls back to the centre.
    pub fn spawn_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        let half = self.player_size * 0.5;
        for _ in 0..SPAWN_ATTEMPTS {
            let candidate = Vec2::new(
                random_axis(rng, half.x, self.width - half.x),
                random_axis(rng, half.y, self.height - half.y),
            );
            if !self.is_blocked(candidate) {
                return candidate;
            }
        }
        self.center()
    }
}

fn clamp_axis(value: f32, lo: f32, hi: f32) -> f32 {
    if hi < lo {
        (lo + hi) * 0.5
    } else {
        value.clamp(lo, hi)
    }
}

fn random_axis<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        (lo + hi) * 0.5
    }
}
