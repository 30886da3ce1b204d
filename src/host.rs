//! Line-delimited JSON host.
//!
//! DESIGN
//! ======
//! One `Frame` per input line in, one `Frame` per output line out. A single
//! writer task owns the output; replies, session events and host errors
//! all reach it through one channel, so lines never interleave.
//!
//! The reader submits calls in input order and hands each reply receiver
//! to a small task, so a slow snapshot never stalls the lines behind it.
//! `session#create` replaces the current session; the old one stops once
//! its handle is dropped and its remaining events are flushed.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::codec::{Args, Decode};
use crate::config::BridgeConfig;
use crate::engine::{HeadlessEngine, HeadlessRasterizer, HeadlessScenes, LoggingPresenter};
use crate::frame::{Data, ErrorCode, Frame};
use crate::session::{CreationParams, SessionDeps, SessionError, SessionHandle, spawn_session};

/// Methods under this namespace are handled by the host itself.
pub const SESSION_PREFIX: &str = "session";
pub const METHOD_SESSION_CREATE: &str = "session#create";
pub const METHOD_SESSION_DISPOSE: &str = "session#dispose";
pub const METHOD_HOST_ERROR: &str = "gateway#error";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("no session; send session#create first")]
    NoSession,
}

impl ErrorCode for HostError {
    fn error_code(&self) -> &'static str {
        "E_NO_SESSION"
    }
}

/// Serve frames from `input` until EOF, writing replies and events to
/// `output`. Returns once every pending reply has been written.
///
/// # Errors
///
/// Returns the first I/O error from reading `input` or writing `output`.
pub async fn serve<R, W>(config: BridgeConfig, input: R, output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::channel(config.event_buffer);
    let writer = tokio::spawn(write_frames(out_rx, output));

    let mut host = Host { config, out: out_tx, session: None };
    let mut lines = input.lines();
    let read_result = loop {
        match lines.next_line().await {
            Ok(Some(line)) => host.on_line(&line).await,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    drop(host);

    let write_result = writer.await.map_err(std::io::Error::other)?;
    read_result.and(write_result)
}

async fn write_frames<W: AsyncWrite + Unpin>(mut rx: mpsc::Receiver<Frame>, mut output: W) -> std::io::Result<()> {
    while let Some(frame) = rx.recv().await {
        let mut line = serde_json::to_vec(&frame).map_err(std::io::Error::other)?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
    }
    output.shutdown().await
}

struct Host {
    config: BridgeConfig,
    out: mpsc::Sender<Frame>,
    session: Option<SessionHandle>,
}

impl Host {
    async fn on_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let frame: Frame = match serde_json::from_str(line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "malformed input line");
                let report = Frame::event(METHOD_HOST_ERROR, Data::new()).with_data("message", e.to_string());
                self.send(report).await;
                return;
            }
        };

        if frame.prefix() != SESSION_PREFIX {
            self.route(frame).await;
            return;
        }
        match frame.op() {
            "create" => self.create(&frame).await,
            "dispose" => {
                if let Some(session) = self.session.take() {
                    info!(view_id = session.view_id(), "session disposed");
                }
                self.send(frame.done()).await;
            }
            _ => self.send(frame.not_implemented()).await,
        }
    }

    async fn create(&mut self, frame: &Frame) {
        let params = match CreationParams::decode(&Args::top(&frame.data)) {
            Ok(params) => params,
            Err(e) => {
                warn!(error = %e, "invalid creation params");
                self.send(frame.error_from(&e)).await;
                return;
            }
        };

        let config = BridgeConfig { view_id: frame.view_id.unwrap_or(self.config.view_id), ..self.config.clone() };
        let deps = SessionDeps {
            engine: Box::new(HeadlessEngine::new(config.viewport)),
            capabilities: Arc::new(config.capabilities()),
            scenes: Arc::new(HeadlessScenes::default()),
            presenter: Arc::new(LoggingPresenter),
            rasterizer: Arc::new(HeadlessRasterizer::default()),
        };
        let (handle, events, _task) = spawn_session(&config, params, deps);
        forward_events(events, self.out.clone());

        if self.session.replace(handle).is_some() {
            debug!("previous session replaced");
        }
        self.send(frame.done().with_view_id(config.view_id)).await;
    }

    async fn route(&mut self, frame: Frame) {
        let Some(session) = &self.session else {
            self.send(frame.error_from(&HostError::NoSession)).await;
            return;
        };
        let pending = match session.submit(frame.clone()).await {
            Ok(pending) => pending,
            Err(e) => {
                self.send(frame.error_from(&e)).await;
                return;
            }
        };
        let out = self.out.clone();
        tokio::spawn(async move {
            let reply = pending.await.unwrap_or_else(|_| frame.error_from(&SessionError::Closed));
            debug!(method = %reply.method, status = ?reply.status, terminal = reply.status.is_terminal(), "reply");
            let _ = out.send(reply).await;
        });
    }

    async fn send(&self, frame: Frame) {
        if self.out.send(frame).await.is_err() {
            warn!("output closed; frame dropped");
        }
    }
}

/// Copy session events to the output until the session stops.
fn forward_events(mut events: mpsc::Receiver<Frame>, out: mpsc::Sender<Frame>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if out.send(event).await.is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
#[path = "host_test.rs"]
mod tests;
