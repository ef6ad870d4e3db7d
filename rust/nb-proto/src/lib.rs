//! nb-proto: Socket protocol between the game client and the bridge.

pub mod codec;
pub mod frame;
pub mod protocol;

pub use codec::{decode_move, decode_state_frame, encode_move, encode_state_frame, DecodeError};
pub use frame::{read_frame, write_frame, FrameError, MAX_FRAME_LEN};
pub use protocol::{MoveCommand, NearbyUsable, StateFrame, Vec2, MAX_NEARBY, PROTOCOL_VERSION};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
