//! # Input
//!
//! The input collaborator pushes [`InputFrame`]s whenever it likes. The
//! tick reads the most recent frame once. Button presses are latched so a
//! press and release between two ticks is still seen.

use skirmish_shared::Vec2;

/// One sample of player intent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputFrame {
    /// Horizontal movement, -1 to 1.
    pub move_x: f32,
    /// Vertical movement, -1 to 1.
    pub move_y: f32,
    /// Aim direction X, world units relative to the player.
    pub aim_x: f32,
    /// Aim direction Y.
    pub aim_y: f32,
    /// Attack button held.
    pub attack: bool,
    /// Special ability button held. Cycles the camera while spectating.
    pub special_ability: bool,
    /// Interact button held. Picks up nearby loot.
    pub interact: bool,
}

impl InputFrame {
    /// Movement direction with each axis clamped and the length capped at 1.
    #[must_use]
    pub fn movement(&self) -> Vec2 {
        let clamp = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Vec2::new(clamp(self.move_x), clamp(self.move_y)).clamp_length(1.0)
    }

    /// Aim angle in radians, if the aim vector is non-zero.
    #[must_use]
    pub fn aim_angle(&self) -> Option<f32> {
        let aim = Vec2::new(self.aim_x, self.aim_y);
        (aim.length_squared() > f32::EPSILON && aim.x.is_finite() && aim.y.is_finite()).then(|| aim.angle())
    }
}

/// What the tick consumes: the latest frame plus latched presses.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickInput {
    /// Most recent frame.
    pub frame: InputFrame,
    /// Attack went from released to held since the last tick.
    pub attack_pressed: bool,
    /// Special ability went from released to held since the last tick.
    pub special_pressed: bool,
    /// Interact went from released to held since the last tick.
    pub interact_pressed: bool,
}

/// Latest-wins input buffer with edge latching.
#[derive(Clone, Debug, Default)]
pub struct InputBuffer {
    latest: InputFrame,
    pending: TickInput,
}

impl InputBuffer {
    /// Creates an idle buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame. Later frames replace earlier ones.
    pub fn push(&mut self, frame: InputFrame) {
        let previous = self.latest;
        self.pending.attack_pressed |= frame.attack && !previous.attack;
        self.pending.special_pressed |= frame.special_ability && !previous.special_ability;
        self.pending.interact_pressed |= frame.interact && !previous.interact;
        self.latest = frame;
    }

    /// Hands the tick its input and clears the latches.
    pub fn take(&mut self) -> TickInput {
        let mut input = std::mem::take(&mut self.pending);
        input.frame = self.latest;
        input
    }

    /// Most recent frame.
    #[must_use]
    pub fn latest(&self) -> &InputFrame {
        &self.latest
    }
}
