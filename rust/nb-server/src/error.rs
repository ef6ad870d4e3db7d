//! Error taxonomy for sessions and the accept loop.

use std::io;

use thiserror::Error;

use nb_core::ConfigError;
use nb_features::WindowError;
use nb_logging::NdjsonError;
use nb_model::ModelError;
use nb_proto::{DecodeError, FrameError};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Zero-length read on a frame boundary.
    PeerClosed,
    /// Read/write failure or EOF inside a frame.
    TransportFault,
    /// Undecodable or oversized payload.
    MalformedFrame,
    /// Feature window or model rejected the step.
    InferenceFailed,
}

impl SessionEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::TransportFault => "transport_fault",
            Self::MalformedFrame => "malformed_frame",
            Self::InferenceFailed => "inference_failed",
        }
    }

    pub fn is_abnormal(&self) -> bool {
        *self != Self::PeerClosed
    }
}

/// Failure that ends one session. Never escapes the accept loop.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] DecodeError),
    #[error("frame too large: {len} > {max}")]
    FrameTooLarge { len: u32, max: u32 },
    #[error("transport fault: {0}")]
    Transport(#[from] io::Error),
    #[error("peer disconnected mid-frame")]
    TruncatedFrame,
    #[error("feature window: {0}")]
    Window(#[from] WindowError),
    #[error("inference failed: {0}")]
    Inference(#[from] ModelError),
}

impl From<FrameError> for SessionError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io(e) => Self::Transport(e),
            FrameError::TooLarge { len, max } => Self::FrameTooLarge { len, max },
            FrameError::UnexpectedEof => Self::TruncatedFrame,
        }
    }
}

impl SessionError {
    pub fn end(&self) -> SessionEnd {
        match self {
            Self::MalformedFrame(_) | Self::FrameTooLarge { .. } => SessionEnd::MalformedFrame,
            Self::Transport(_) | Self::TruncatedFrame => SessionEnd::TransportFault,
            Self::Window(_) | Self::Inference(_) => SessionEnd::InferenceFailed,
        }
    }
}

/// Startup and listening-socket failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to load model: {0}")]
    ModelLoad(#[from] ModelError),
    #[error("model expects input dimension {model}, window is configured for {window}")]
    DimMismatch { model: usize, window: usize },
    #[error("feature window: {0}")]
    Window(#[from] WindowError),
    #[error("failed to open event log: {0}")]
    EventLog(#[from] NdjsonError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
}
