//! nb-logging: tracing setup + NDJSON session events.
//!
//! Diagnostics go through `tracing`. Session lifecycle records are also
//! appended to an optional NDJSON file for post-mortems.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const EVENT_SESSION_START: &str = "session_start";
pub const EVENT_SESSION_END: &str = "session_end";

/// Install a global fmt subscriber writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. "info") applies.
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(
    default_directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
}

pub fn now_ms() -> u64 {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    d.as_millis() as u64
}

/// Minimal log schema versioning fields.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VersionInfoV1 {
    pub protocol_version: u32,
    pub feature_schema_id: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStartEventV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub v: VersionInfoV1,

    pub session_id: u64,
    pub peer: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InferStatsV1 {
    pub calls: u64,
    pub latency_mean_us: f64,
    pub latency_max_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionEndEventV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub v: VersionInfoV1,

    pub session_id: u64,
    pub peer: String,
    /// "peer_closed" | "transport_fault" | "malformed_frame" | "inference_failed"
    pub end: &'static str,
    pub error: Option<String>,

    pub frames: u64,
    pub replies: u64,
    pub malformed_skipped: u64,
    pub elapsed_ms: u64,

    pub infer: InferStatsV1,
}

#[derive(Debug, Error)]
pub enum NdjsonError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append-only NDJSON writer.
///
/// Contract: each call writes exactly one JSON object followed by a newline.
pub struct NdjsonWriter {
    w: BufWriter<File>,
    lines_since_flush: u64,
    flush_every_lines: u64,
}

impl NdjsonWriter {
    /// Open a file for append. Creates it if it doesn't exist.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self, NdjsonError> {
        Self::open_append_with_flush(path, 0)
    }

    /// `flush_every_lines=0` disables periodic flushing.
    pub fn open_append_with_flush(
        path: impl AsRef<Path>,
        flush_every_lines: u64,
    ) -> Result<Self, NdjsonError> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            w: BufWriter::new(f),
            lines_since_flush: 0,
            flush_every_lines,
        })
    }

    pub fn write_event<T: Serialize>(&mut self, event: &T) -> Result<(), NdjsonError> {
        let mut buf = serde_json::to_vec(event)?;
        buf.push(b'\n');
        self.w.write_all(&buf)?;
        self.lines_since_flush += 1;
        if self.flush_every_lines > 0 && self.lines_since_flush >= self.flush_every_lines {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), NdjsonError> {
        self.w.flush()?;
        self.lines_since_flush = 0;
        Ok(())
    }
}

impl Drop for NdjsonWriter {
    fn drop(&mut self) {
        let _ = self.w.flush();
    }
}
