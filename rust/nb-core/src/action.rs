//! Logit-to-action policy.
//!
//! The model emits four gate values ordered `(+x, -x, +y, -y)`. Each gate is
//! thresholded independently; the two gates of one axis are summed, so when
//! both fire they cancel to 0. There is no mutual exclusion between gates.

/// Number of model outputs consumed by [`decode_action`].
pub const LOGITS_LEN: usize = 4;

/// A gate fires when its value is strictly greater than this.
pub const ACTION_THRESHOLD: f32 = 0.5;

/// Raw model outputs, ordered `(+x, -x, +y, -y)`.
pub type Logits = [f32; LOGITS_LEN];

/// Desired movement along two independent axes, each in `{-1, 0, 1}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ActionCommand {
    pub x: i8,
    pub y: i8,
}

impl ActionCommand {
    pub const IDLE: Self = Self { x: 0, y: 0 };

    pub fn new(x: i8, y: i8) -> Self {
        debug_assert!((-1..=1).contains(&x) && (-1..=1).contains(&y));
        Self { x, y }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }
}

#[inline]
fn gate(v: f32) -> i8 {
    // NaN compares false and therefore never fires.
    i8::from(v > ACTION_THRESHOLD)
}

/// Map four gate values to a movement command.
pub fn decode_action(logits: &Logits) -> ActionCommand {
    ActionCommand {
        x: gate(logits[0]) - gate(logits[1]),
        y: gate(logits[2]) - gate(logits[3]),
    }
}
