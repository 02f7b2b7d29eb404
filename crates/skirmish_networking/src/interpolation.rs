//! # Snapshot Interpolation
//!
//! Remote players arrive as discrete samples: a broadcast delta every tick
//! when the network is kind, a durable row every few seconds when it isn't.
//! Drawing them at the raw sample would stutter, so each player keeps its
//! last two samples and renders between them:
//!
//! ```text
//! sample:      prev ─────────────── curr
//! arrival:     t0                   t1
//! rendered at: t1 → prev   ...   t1 + (t1 - t0) → curr
//! ```
//!
//! The view runs one sample interval behind, which hides jitter up to that
//! interval.

use skirmish_shared::math::lerp_angle;
use skirmish_shared::{PlayerState, Vec2};
use std::time::Instant;

/// Easing applied to the interpolation factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InterpolationMode {
    /// No interpolation - render the latest sample
    HardSnap,
    /// Linear interpolation over time
    #[default]
    Linear,
    /// Very smooth S-curve
    SmoothStep,
}

impl InterpolationMode {
    fn ease(self, t: f32) -> f32 {
        match self {
            Self::HardSnap => 1.0,
            Self::Linear => t,
            // S-curve: 3t^2 - 2t^3
            Self::SmoothStep => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Motion of one player at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Position.
    pub position: Vec2,
    /// Velocity.
    pub velocity: Vec2,
    /// Facing, radians.
    pub rotation: f32,
    /// When the sample was applied locally.
    pub at: Instant,
}

impl Sample {
    /// Takes the motion fields of `state`.
    #[must_use]
    pub fn from_state(state: &PlayerState, at: Instant) -> Self {
        Self {
            position: state.position(),
            velocity: state.velocity(),
            rotation: state.rotation,
            at,
        }
    }
}

/// Interpolated motion, ready to render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterpolatedState {
    /// Position X.
    pub x: f32,
    /// Position Y.
    pub y: f32,
    /// Facing, radians.
    pub rotation: f32,
    /// Velocity X.
    pub vx: f32,
    /// Velocity Y.
    pub vy: f32,
}

impl InterpolatedState {
    /// Position as a vector.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Sample> for InterpolatedState {
    fn from(sample: Sample) -> Self {
        Self {
            x: sample.position.x,
            y: sample.position.y,
            rotation: sample.rotation,
            vx: sample.velocity.x,
            vy: sample.velocity.y,
        }
    }
}

/// The last two samples of one player.
#[derive(Clone, Debug)]
pub struct SampleTrack {
    previous: Option<Sample>,
    current: Sample,
    mode: InterpolationMode,
}

impl SampleTrack {
    /// Starts a track with a single sample.
    #[must_use]
    pub fn new(first: Sample) -> Self {
        Self {
            previous: None,
            current: first,
            mode: InterpolationMode::default(),
        }
    }

    /// Changes the easing.
    #[must_use]
    pub fn with_mode(mut self, mode: InterpolationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Records a newer sample.
    pub fn push(&mut self, sample: Sample) {
        self.previous = Some(self.current);
        self.current = sample;
    }

    /// Latest sample.
    #[must_use]
    pub fn latest(&self) -> Sample {
        self.current
    }

    /// Motion to render at `now`.
    #[must_use]
    pub fn interpolate(&self, now: Instant) -> InterpolatedState {
        let Some(previous) = self.previous else {
            return self.current.into();
        };
        let span = self
            .current
            .at
            .saturating_duration_since(previous.at)
            .as_secs_f32();
        if span <= f32::EPSILON {
            return self.current.into();
        }
        let elapsed = now.saturating_duration_since(self.current.at).as_secs_f32();
        let t = self.mode.ease((elapsed / span).clamp(0.0, 1.0));

        let position = previous.position.lerp(self.current.position, t);
        let velocity = previous.velocity.lerp(self.current.velocity, t);
        InterpolatedState {
            x: position.x,
            y: position.y,
            rotation: lerp_angle(previous.rotation, self.current.rotation, t),
            vx: velocity.x,
            vy: velocity.y,
        }
    }
}
