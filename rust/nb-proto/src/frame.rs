//! Length-delimited framing (u32 little-endian length prefix).

use std::io::{ErrorKind, Read, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame too large: {len} > {max}")]
    TooLarge { len: u32, max: u32 },
    #[error("unexpected EOF while reading frame")]
    UnexpectedEof,
}

pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024; // 64 MiB guardrail

pub fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let len: u32 = payload.len().try_into().map_err(|_| FrameError::TooLarge {
        len: u32::MAX,
        max: MAX_FRAME_LEN,
    })?;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    w.write_all(&len.to_le_bytes())?;
    w.write_all(payload)?;
    w.flush()?;
    Ok(())
}

/// Read one frame.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly on a frame
/// boundary. EOF anywhere inside a frame is [`FrameError::UnexpectedEof`].
pub fn read_frame<R: Read>(r: &mut R, max_len: u32) -> Result<Option<Vec<u8>>, FrameError> {
    let mut len_bytes = [0u8; 4];
    if read_exact_or_eof(r, &mut len_bytes)? == 0 {
        return Ok(None);
    }
    let len = u32::from_le_bytes(len_bytes);
    let max = max_len.min(MAX_FRAME_LEN);
    if len > max {
        return Err(FrameError::TooLarge { len, max });
    }
    let mut payload = vec![0u8; len as usize];
    if read_exact_or_eof(r, &mut payload)? == 0 && !payload.is_empty() {
        return Err(FrameError::UnexpectedEof);
    }
    Ok(Some(payload))
}

/// Fill `buf`. Returns 0 if the stream ended before any byte was read, else
/// `buf.len()`; EOF after a partial read is an error.
fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize, FrameError> {
    let mut off = 0usize;
    while off < buf.len() {
        match r.read(&mut buf[off..]) {
            Ok(0) if off == 0 => return Ok(0),
            Ok(0) => return Err(FrameError::UnexpectedEof),
            Ok(n) => off += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(off)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_two_frames_then_clean_eof() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"abc").unwrap();
        write_frame(&mut buf, b"").unwrap();

        let mut r = Cursor::new(buf);
        assert_eq!(read_frame(&mut r, MAX_FRAME_LEN).unwrap().unwrap(), b"abc");
        assert_eq!(read_frame(&mut r, MAX_FRAME_LEN).unwrap().unwrap(), b"");
        assert!(read_frame(&mut r, MAX_FRAME_LEN).unwrap().is_none());
    }

    #[test]
    fn empty_stream_is_clean_close() {
        let mut r = Cursor::new(Vec::<u8>::new());
        assert!(read_frame(&mut r, MAX_FRAME_LEN).unwrap().is_none());
    }

    #[test]
    fn eof_inside_header_is_unexpected() {
        let mut r = Cursor::new(vec![5u8, 0]);
        assert!(matches!(
            read_frame(&mut r, MAX_FRAME_LEN),
            Err(FrameError::UnexpectedEof)
        ));
    }

    #[test]
    fn eof_inside_payload_is_unexpected() {
        let mut bytes = 10u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"short");
        let mut r = Cursor::new(bytes);
        assert!(matches!(
            read_frame(&mut r, MAX_FRAME_LEN),
            Err(FrameError::UnexpectedEof)
        ));
    }

    #[test]
    fn eof_right_after_header_is_unexpected() {
        let mut r = Cursor::new(4u32.to_le_bytes().to_vec());
        assert!(matches!(
            read_frame(&mut r, MAX_FRAME_LEN),
            Err(FrameError::UnexpectedEof)
        ));
    }

    #[test]
    fn length_over_limit_is_rejected() {
        let mut r = Cursor::new(100u32.to_le_bytes().to_vec());
        match read_frame(&mut r, 64) {
            Err(FrameError::TooLarge { len, max }) => {
                assert_eq!(len, 100);
                assert_eq!(max, 64);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }
}
