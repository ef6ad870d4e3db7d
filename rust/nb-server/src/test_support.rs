//! Shared fixtures for session and server tests.

use std::io::{self, Cursor, Read, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use nb_core::Logits;
use nb_features::{FeatureExtractor, FeatureVector};
use nb_model::{ModelError, SequenceModel};
use nb_proto::{encode_state_frame, write_frame, StateFrame, Vec2};

use crate::{Server, ServerOptions, SessionOptions, SessionReport};

pub const DIM: usize = 4;
pub const LEN: usize = 10;

/// Feature vector = `[position.x; DIM]`, so every frame maps to a constant vector.
#[derive(Debug, Default)]
pub struct PositionExtractor {
    last_x: Option<f32>,
}

impl FeatureExtractor for PositionExtractor {
    fn update(&mut self, frame: &StateFrame) {
        self.last_x = Some(frame.position.x);
    }

    fn current_feature_vector(&self) -> FeatureVector {
        vec![self.last_x.unwrap_or(0.0); DIM]
    }

    fn feature_dim(&self) -> usize {
        DIM
    }
}

/// Records every window it is asked to evaluate.
pub struct RecordingModel {
    pub windows: Mutex<Vec<Vec<Vec<f32>>>>,
    pub logits: Logits,
    pub fail: bool,
}

impl RecordingModel {
    pub fn new(logits: Logits) -> Self {
        Self {
            windows: Mutex::new(Vec::new()),
            logits,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new([0.0; 4])
        }
    }

    pub fn windows(&self) -> Vec<Vec<Vec<f32>>> {
        self.windows.lock().unwrap().clone()
    }
}

impl SequenceModel for RecordingModel {
    fn input_dim(&self) -> usize {
        DIM
    }

    fn infer(&self, window: &[Vec<f32>]) -> Result<Logits, ModelError> {
        self.windows.lock().unwrap().push(window.to_vec());
        if self.fail {
            return Err(ModelError::EmptyWindow);
        }
        Ok(self.logits)
    }
}

pub fn frame(tick: u64, x: f32) -> StateFrame {
    StateFrame {
        tick,
        position: Vec2::new(x, 0.0),
        ..StateFrame::default()
    }
}

pub fn constant(x: f32) -> Vec<f32> {
    vec![x; DIM]
}

/// `[0; DIM] × (LEN - reals.len())` followed by `reals` as constant vectors.
pub fn padded(reals: &[f32]) -> Vec<Vec<f32>> {
    let mut out = vec![vec![0.0; DIM]; LEN - reals.len()];
    out.extend(reals.iter().map(|&x| constant(x)));
    out
}

pub fn framed(payloads: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for p in payloads {
        write_frame(&mut out, p).unwrap();
    }
    out
}

pub fn framed_frames(frames: &[StateFrame]) -> Vec<u8> {
    let payloads: Vec<Vec<u8>> = frames.iter().map(encode_state_frame).collect();
    framed(&payloads)
}

/// In-memory duplex: reads from a fixed script, collects writes.
pub struct MemStream {
    pub input: Cursor<Vec<u8>>,
    pub output: Vec<u8>,
}

impl MemStream {
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            input: Cursor::new(input),
            output: Vec::new(),
        }
    }
}

impl Read for MemStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MemStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reads from a fixed script; every write fails with `BrokenPipe`.
pub struct BrokenPipeStream {
    pub input: Cursor<Vec<u8>>,
}

impl BrokenPipeStream {
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            input: Cursor::new(input),
        }
    }
}

impl Read for BrokenPipeStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for BrokenPipeStream {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
    }
}

pub fn server_options(session: SessionOptions) -> ServerOptions {
    ServerOptions {
        window_len: LEN,
        feature_dim: DIM,
        nodelay: true,
        max_sessions: None,
        session,
    }
}

/// Bind on an ephemeral port and serve `n` sessions on a background thread.
pub fn start_server(
    model: Arc<RecordingModel>,
    session: SessionOptions,
    n: usize,
) -> (SocketAddr, JoinHandle<Vec<SessionReport>>) {
    let mut server = Server::bind(
        "127.0.0.1:0",
        model,
        PositionExtractor::default,
        server_options(session),
    )
    .unwrap();
    let addr = server.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut reports = Vec::with_capacity(n);
        for _ in 0..n {
            reports.push(server.serve_one().unwrap());
        }
        reports
    });
    (addr, handle)
}
