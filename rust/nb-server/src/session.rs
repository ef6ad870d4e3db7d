//! One client session: frames in, move commands out, strictly paired.
//!
//! Per frame: decode → extractor update → window push → infer → action
//! decode → encode → send. Nothing is written until the whole pipeline for the
//! current frame has finished. The window is cleared when a session starts
//! and again when it is dropped, whatever the exit path.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use nb_core::{decode_action, MalformedPolicy};
use nb_features::{FeatureExtractor, FeatureWindow};
use nb_model::SequenceModel;
use nb_proto::{decode_state_frame, encode_move, read_frame, write_frame, MoveCommand, StateFrame};

use crate::error::SessionError;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Largest accepted payload in bytes.
    pub max_frame_len: u32,
    pub on_malformed: MalformedPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_frame_len: 64 * 1024,
            on_malformed: MalformedPolicy::Terminate,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    /// Frames read off the wire, including skipped malformed ones.
    pub frames: u64,
    pub replies: u64,
    pub malformed_skipped: u64,
    pub infer_calls: u64,
    pub infer_total: Duration,
    pub infer_max: Duration,
}

impl SessionStats {
    fn on_infer(&mut self, dt: Duration) {
        self.infer_calls += 1;
        self.infer_total += dt;
        self.infer_max = self.infer_max.max(dt);
    }

    pub fn infer_mean_us(&self) -> f64 {
        if self.infer_calls == 0 {
            return 0.0;
        }
        self.infer_total.as_secs_f64() * 1e6 / self.infer_calls as f64
    }
}

pub struct Session<'a, M: SequenceModel + ?Sized, E: FeatureExtractor> {
    model: &'a M,
    extractor: E,
    window: &'a mut FeatureWindow,
    opts: SessionOptions,
    stats: SessionStats,
}

impl<'a, M: SequenceModel + ?Sized, E: FeatureExtractor> Session<'a, M, E> {
    /// `extractor` must be a fresh instance.
    pub fn new(
        model: &'a M,
        extractor: E,
        window: &'a mut FeatureWindow,
        opts: SessionOptions,
    ) -> Self {
        window.clear();
        Self {
            model,
            extractor,
            window,
            opts,
            stats: SessionStats::default(),
        }
    }

    /// Serve frames until the peer closes (`Ok`) or the session fails.
    pub fn run<S: Read + Write>(&mut self, stream: &mut S) -> Result<(), SessionError> {
        loop {
            let Some(payload) = read_frame(stream, self.opts.max_frame_len)? else {
                return Ok(());
            };
            self.stats.frames += 1;

            let frame = match decode_state_frame(&payload) {
                Ok(f) => f,
                Err(e) if self.opts.on_malformed == MalformedPolicy::Skip => {
                    self.stats.malformed_skipped += 1;
                    warn!(error = %e, len = payload.len(), "skipping malformed frame");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let reply = self.step(&frame)?;
            write_frame(stream, &encode_move(&reply))?;
            self.stats.replies += 1;
        }
    }

    /// Run the pipeline for one decoded frame and build the reply.
    pub fn step(&mut self, frame: &StateFrame) -> Result<MoveCommand, SessionError> {
        self.extractor.update(frame);
        self.window.push(self.extractor.current_feature_vector())?;

        let input = self.window.materialize();
        let t0 = Instant::now();
        let logits = self.model.infer(&input)?;
        self.stats.on_infer(t0.elapsed());

        let action = decode_action(&logits);
        debug!(tick = frame.tick, x = action.x, y = action.y, ?logits, "action");
        Ok(MoveCommand::from_action(frame.tick, action))
    }

    pub fn window(&self) -> &FeatureWindow {
        self.window
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }
}

impl<M: SequenceModel + ?Sized, E: FeatureExtractor> Drop for Session<'_, M, E> {
    fn drop(&mut self) {
        self.window.clear();
    }
}
