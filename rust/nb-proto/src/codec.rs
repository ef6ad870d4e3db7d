//! Binary codec for protocol v1 (payload inside a length-delimited frame).

use thiserror::Error;

use crate::protocol::{
    MoveCommand, MsgKind, NearbyUsable, StateFrame, Vec2, MAX_NEARBY, PROTOCOL_VERSION,
};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload too short")]
    TooShort,
    #[error("unsupported protocol version: {0}")]
    BadVersion(u32),
    #[error("unexpected message kind: {0}")]
    BadKind(u8),
    #[error("invalid boolean byte: {0}")]
    BadBool(u8),
    #[error("too many nearby entries: got {got}, max {max}")]
    TooManyNearby { got: u8, max: usize },
    #[error("{0} trailing bytes after message body")]
    TrailingBytes(usize),
}

// header: u32 version + u8 kind + u8 flags + u16 reserved = 8 bytes
const HEADER_LEN: usize = 8;
// x, y, path_len
const USABLE_LEN: usize = 12;

pub fn encode_state_frame_len(frame: &StateFrame) -> usize {
    // tick + position + kill_cooldown + 2 bools + body dir + 2 counts
    HEADER_LEN
        + 8
        + 8
        + 4
        + 2
        + 8
        + 2
        + (frame.nearby_doors.len() + frame.nearby_vents.len()) * USABLE_LEN
}

pub fn encode_state_frame(frame: &StateFrame) -> Vec<u8> {
    let mut out = Vec::with_capacity(encode_state_frame_len(frame));
    encode_state_frame_into(&mut out, frame);
    out
}

/// Encode into `out`, replacing its contents.
///
/// At most [`MAX_NEARBY`] doors and vents are written; extras are dropped.
pub fn encode_state_frame_into(out: &mut Vec<u8>, frame: &StateFrame) {
    out.clear();
    out.reserve(encode_state_frame_len(frame));

    put_header(out, MsgKind::StateFrame);
    out.extend_from_slice(&frame.tick.to_le_bytes());
    put_vec2(out, frame.position);
    out.extend_from_slice(&frame.kill_cooldown.to_le_bytes());
    out.push(u8::from(frame.is_impostor));
    out.push(u8::from(frame.is_dead));
    put_vec2(out, frame.direction_to_nearest_body);
    put_usables(out, &frame.nearby_doors);
    put_usables(out, &frame.nearby_vents);
}

pub fn decode_state_frame(bytes: &[u8]) -> Result<StateFrame, DecodeError> {
    let mut c = Cursor::new(bytes);
    c.read_header(MsgKind::StateFrame)?;

    let tick = c.read_u64()?;
    let position = c.read_vec2()?;
    let kill_cooldown = c.read_f32()?;
    let is_impostor = c.read_bool()?;
    let is_dead = c.read_bool()?;
    let direction_to_nearest_body = c.read_vec2()?;
    let nearby_doors = c.read_usables()?;
    let nearby_vents = c.read_usables()?;
    c.finish()?;

    Ok(StateFrame {
        tick,
        position,
        kill_cooldown,
        is_impostor,
        is_dead,
        direction_to_nearest_body,
        nearby_doors,
        nearby_vents,
    })
}

pub fn encode_move(cmd: &MoveCommand) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 16);
    put_header(&mut out, MsgKind::MoveCommand);
    out.extend_from_slice(&cmd.tick.to_le_bytes());
    put_vec2(&mut out, cmd.desired_move_direction);
    out
}

pub fn decode_move(bytes: &[u8]) -> Result<MoveCommand, DecodeError> {
    let mut c = Cursor::new(bytes);
    c.read_header(MsgKind::MoveCommand)?;
    let tick = c.read_u64()?;
    let desired_move_direction = c.read_vec2()?;
    c.finish()?;
    Ok(MoveCommand {
        tick,
        desired_move_direction,
    })
}

fn put_header(out: &mut Vec<u8>, kind: MsgKind) {
    out.extend_from_slice(&PROTOCOL_VERSION.to_le_bytes());
    out.push(kind as u8);
    out.push(0); // flags
    out.extend_from_slice(&[0, 0]); // reserved
}

fn put_vec2(out: &mut Vec<u8>, v: Vec2) {
    out.extend_from_slice(&v.x.to_le_bytes());
    out.extend_from_slice(&v.y.to_le_bytes());
}

fn put_usables(out: &mut Vec<u8>, items: &[NearbyUsable]) {
    let items = &items[..items.len().min(MAX_NEARBY)];
    out.push(items.len() as u8);
    for u in items {
        put_vec2(out, u.position);
        out.extend_from_slice(&u.path_len.to_le_bytes());
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    off: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, off: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.off + n > self.bytes.len() {
            return Err(DecodeError::TooShort);
        }
        let s = &self.bytes[self.off..self.off + n];
        self.off += n;
        Ok(s)
    }

    fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.take(n).map(|_| ())
    }

    fn finish(&self) -> Result<(), DecodeError> {
        match self.bytes.len() - self.off {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }

    fn read_header(&mut self, expected: MsgKind) -> Result<(), DecodeError> {
        let version = self.read_u32()?;
        if version != PROTOCOL_VERSION {
            return Err(DecodeError::BadVersion(version));
        }
        let kind = self.read_u8()?;
        if kind != expected as u8 {
            return Err(DecodeError::BadKind(kind));
        }
        let _flags = self.read_u8()?;
        self.skip(2)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(DecodeError::BadBool(b)),
        }
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn read_f32(&mut self) -> Result<f32, DecodeError> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_vec2(&mut self) -> Result<Vec2, DecodeError> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    fn read_usables(&mut self) -> Result<Vec<NearbyUsable>, DecodeError> {
        let n = self.read_u8()?;
        if n as usize > MAX_NEARBY {
            return Err(DecodeError::TooManyNearby {
                got: n,
                max: MAX_NEARBY,
            });
        }
        let mut out = Vec::with_capacity(n as usize);
        for _ in 0..n {
            out.push(NearbyUsable {
                position: self.read_vec2()?,
                path_len: self.read_f32()?,
            });
        }
        Ok(out)
    }
}
