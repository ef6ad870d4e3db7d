//! Protocol v1 definitions for game client ↔ bridge.
//!
//! This module defines the on-wire contract and sizes to validate against.

use nb_core::ActionCommand;

/// Protocol version carried in every payload header.
pub const PROTOCOL_VERSION: u32 = 1;

/// Most doors / vents a client reports per frame.
pub const MAX_NEARBY: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// A door or vent near the local player.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NearbyUsable {
    pub position: Vec2,
    /// Pathfinding distance from the local player.
    pub path_len: f32,
}

/// One client state update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateFrame {
    pub tick: u64,
    pub position: Vec2,
    pub kill_cooldown: f32,
    pub is_impostor: bool,
    pub is_dead: bool,
    /// Unit vector towards the nearest dead body, zero when none is known.
    pub direction_to_nearest_body: Vec2,
    pub nearby_doors: Vec<NearbyUsable>, // len <= MAX_NEARBY
    pub nearby_vents: Vec<NearbyUsable>, // len <= MAX_NEARBY
}

/// Reply to one [`StateFrame`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveCommand {
    /// Tick of the frame this answers.
    pub tick: u64,
    pub desired_move_direction: Vec2,
}

impl MoveCommand {
    pub fn from_action(tick: u64, action: ActionCommand) -> Self {
        Self {
            tick,
            desired_move_direction: Vec2::new(f32::from(action.x), f32::from(action.y)),
        }
    }

    /// Back to an action; values are rounded and clamped to `{-1, 0, 1}`.
    pub fn action(&self) -> ActionCommand {
        fn axis(v: f32) -> i8 {
            v.round().clamp(-1.0, 1.0) as i8
        }
        ActionCommand::new(
            axis(self.desired_move_direction.x),
            axis(self.desired_move_direction.y),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgKind {
    StateFrame = 1,
    MoveCommand = 2,
}
