//! Connection manager: one listening socket, one session at a time.
//!
//! `accept` is only reissued after the previous session has returned, so a
//! second client waits in the listen backlog until the first one is gone.
//! Session failures are logged and the loop goes back to accepting; only
//! listening-socket failures end `serve`.

use std::io::{self, ErrorKind};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Instant;

use tracing::{debug, info, warn};

use nb_core::Config;
use nb_features::{FeatureExtractor, FeatureWindow, FEATURE_SCHEMA_ID};
use nb_logging::{
    now_ms, InferStatsV1, NdjsonWriter, SessionEndEventV1, SessionStartEventV1, VersionInfoV1,
    EVENT_SESSION_END, EVENT_SESSION_START,
};
use nb_model::SequenceModel;
use nb_proto::PROTOCOL_VERSION;

use crate::error::{ServerError, SessionEnd};
use crate::session::{Session, SessionOptions, SessionStats};

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub window_len: usize,
    pub feature_dim: usize,
    pub nodelay: bool,
    /// Return from [`Server::serve`] after this many sessions.
    pub max_sessions: Option<u64>,
    pub session: SessionOptions,
}

impl ServerOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            window_len: cfg.window.len,
            feature_dim: cfg.window.feature_dim,
            nodelay: cfg.server.nodelay,
            max_sessions: cfg.server.max_sessions,
            session: SessionOptions {
                max_frame_len: cfg.server.max_frame_len,
                on_malformed: cfg.session.on_malformed,
            },
        }
    }
}

/// Outcome of one session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: u64,
    pub peer: SocketAddr,
    pub end: SessionEnd,
    pub error: Option<String>,
    pub stats: SessionStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeSummary {
    pub sessions: u64,
    pub peer_closed: u64,
    pub abnormal: u64,
}

pub struct Server<M, F> {
    listener: TcpListener,
    model: M,
    new_extractor: F,
    window: FeatureWindow,
    opts: ServerOptions,
    events: Option<NdjsonWriter>,
    next_session_id: u64,
}

impl<M, E, F> Server<M, F>
where
    M: SequenceModel,
    E: FeatureExtractor,
    F: FnMut() -> E,
{
    /// Bind the listening socket. `new_extractor` is called once per session.
    pub fn bind<A: ToSocketAddrs + std::fmt::Display>(
        addr: A,
        model: M,
        new_extractor: F,
        opts: ServerOptions,
    ) -> Result<Self, ServerError> {
        if model.input_dim() != opts.feature_dim {
            return Err(ServerError::DimMismatch {
                model: model.input_dim(),
                window: opts.feature_dim,
            });
        }
        let window = FeatureWindow::new(opts.window_len, opts.feature_dim)?;
        let listener = TcpListener::bind(&addr).map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        Ok(Self {
            listener,
            model,
            new_extractor,
            window,
            opts,
            events: None,
            next_session_id: 1,
        })
    }

    /// Bind from config, opening the event log if one is configured.
    pub fn from_config(cfg: &Config, model: M, new_extractor: F) -> Result<Self, ServerError> {
        cfg.validate()?;
        let server = Self::bind(
            cfg.server.bind.as_str(),
            model,
            new_extractor,
            ServerOptions::from_config(cfg),
        )?;
        match &cfg.logging.events_path {
            Some(path) => Ok(server.with_event_log(NdjsonWriter::open_append_with_flush(
                path,
                cfg.logging.flush_every_lines,
            )?)),
            None => Ok(server),
        }
    }

    pub fn with_event_log(mut self, writer: NdjsonWriter) -> Self {
        self.events = Some(writer);
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Accept and run sessions until `max_sessions` is reached (or forever).
    pub fn serve(&mut self) -> Result<ServeSummary, ServerError> {
        if let Ok(addr) = self.local_addr() {
            info!(%addr, "listening");
        }
        let mut summary = ServeSummary::default();
        while self.opts.max_sessions.map_or(true, |n| summary.sessions < n) {
            let report = self.serve_one()?;
            summary.sessions += 1;
            if report.end.is_abnormal() {
                summary.abnormal += 1;
            } else {
                summary.peer_closed += 1;
            }
        }
        Ok(summary)
    }

    /// Wait for one client and run its session to completion.
    pub fn serve_one(&mut self) -> Result<SessionReport, ServerError> {
        info!("waiting for connection");
        let (stream, peer) = self.accept()?;
        Ok(self.run_session(stream, peer))
    }

    fn accept(&mut self) -> Result<(TcpStream, SocketAddr), ServerError> {
        loop {
            match self.listener.accept() {
                Ok(pair) => return Ok(pair),
                // The failed connection is gone, the listener is fine.
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                            | ErrorKind::Interrupted
                    ) =>
                {
                    warn!(error = %e, "accept interrupted; retrying");
                }
                Err(e) => return Err(ServerError::Accept(e)),
            }
        }
    }

    fn run_session(&mut self, mut stream: TcpStream, peer: SocketAddr) -> SessionReport {
        let session_id = self.next_session_id;
        self.next_session_id += 1;

        if self.opts.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!(session_id, error = %e, "set_nodelay failed");
            }
        }
        info!(session_id, %peer, "client connected");
        self.emit_start(session_id, peer);

        let t0 = Instant::now();
        let extractor = (self.new_extractor)();
        let mut session = Session::new(
            &self.model,
            extractor,
            &mut self.window,
            self.opts.session.clone(),
        );
        let result = session.run(&mut stream);
        let stats = session.stats().clone();
        drop(session);
        if let Err(e) = stream.shutdown(Shutdown::Both) {
            if !is_expected_shutdown_error(&e) {
                debug!(session_id, error = %e, "socket shutdown failed");
            }
        }
        drop(stream);

        let (end, error) = match result {
            Ok(()) => (SessionEnd::PeerClosed, None),
            Err(e) => (e.end(), Some(e.to_string())),
        };
        let elapsed_ms = t0.elapsed().as_millis() as u64;
        if end.is_abnormal() {
            warn!(
                session_id,
                end = end.as_str(),
                error = error.as_deref().unwrap_or(""),
                frames = stats.frames,
                "session ended abnormally"
            );
        } else {
            info!(
                session_id,
                frames = stats.frames,
                replies = stats.replies,
                elapsed_ms,
                "client disconnected"
            );
        }

        let report = SessionReport {
            session_id,
            peer,
            end,
            error,
            stats,
        };
        self.emit_end(&report, elapsed_ms);
        report
    }

    fn emit_start(&mut self, session_id: u64, peer: SocketAddr) {
        let Some(w) = self.events.as_mut() else {
            return;
        };
        let ev = SessionStartEventV1 {
            event: EVENT_SESSION_START,
            ts_ms: now_ms(),
            v: version_info(),
            session_id,
            peer: peer.to_string(),
        };
        if let Err(e) = w.write_event(&ev) {
            warn!(session_id, error = %e, "event log write failed");
        }
    }

    fn emit_end(&mut self, report: &SessionReport, elapsed_ms: u64) {
        let Some(w) = self.events.as_mut() else {
            return;
        };
        let s = &report.stats;
        let ev = SessionEndEventV1 {
            event: EVENT_SESSION_END,
            ts_ms: now_ms(),
            v: version_info(),
            session_id: report.session_id,
            peer: report.peer.to_string(),
            end: report.end.as_str(),
            error: report.error.clone(),
            frames: s.frames,
            replies: s.replies,
            malformed_skipped: s.malformed_skipped,
            elapsed_ms,
            infer: InferStatsV1 {
                calls: s.infer_calls,
                latency_mean_us: s.infer_mean_us(),
                latency_max_us: s.infer_max.as_micros() as u64,
            },
        };
        if let Err(e) = w.write_event(&ev) {
            warn!(session_id = report.session_id, error = %e, "event log write failed");
        }
    }
}

/// The peer already tore the connection down.
fn is_expected_shutdown_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::NotConnected | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe
    )
}

fn version_info() -> VersionInfoV1 {
    VersionInfoV1 {
        protocol_version: PROTOCOL_VERSION,
        feature_schema_id: FEATURE_SCHEMA_ID,
    }
}
