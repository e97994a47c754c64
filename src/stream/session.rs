use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::stream::messages::{StreamConfig, StreamEvent, StreamRequest};
use crate::stream::transport::Transport;

/// Receives every inbound response, uninterpreted.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn on_response(&self, message: serde_json::Value);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Unopened,
    Configuring,
    Active,
    Closed,
}

impl SessionState {
    fn name(self) -> &'static str {
        match self {
            SessionState::Unopened => "unopened",
            SessionState::Configuring => "configuring",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        }
    }
}

/// One duplex stream to the speech service.
///
/// Lifecycle is `Unopened -> Configuring -> Active -> Closed`, closed being
/// terminal. The config message must be the first write on the stream;
/// start/stop events are only valid while active. The state lock doubles as
/// the write serializer, so frames from the capture pump and events from the
/// controller never interleave.
pub struct StreamSession {
    transport: Arc<dyn Transport>,
    state: Mutex<SessionState>,
}

impl StreamSession {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: Mutex::new(SessionState::Unopened),
        }
    }

    /// Write the configuration message and activate the session.
    ///
    /// Valid only once, on an unopened session. A failed config write leaves
    /// the session closed; there is no retry.
    pub async fn open(&self, config: StreamConfig) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state != SessionState::Unopened {
            return Err(Error::InvalidState {
                operation: "open",
                state: state.name(),
            });
        }
        *state = SessionState::Configuring;

        let payload = serde_json::to_vec(&StreamRequest::Config(config))?;
        if let Err(e) = self.transport.send(payload).await {
            *state = SessionState::Closed;
            return Err(e);
        }
        if let Err(e) = self.transport.flush().await {
            *state = SessionState::Closed;
            return Err(e);
        }

        *state = SessionState::Active;
        info!("stream session active");
        Ok(())
    }

    /// Send the start event opening a recording segment.
    pub async fn send_start(&self) -> Result<()> {
        self.send_event(StreamEvent::Start, "send start").await
    }

    /// Send the stop event closing the current recording segment.
    pub async fn send_stop(&self) -> Result<()> {
        self.send_event(StreamEvent::Stop, "send stop").await
    }

    async fn send_event(&self, event: StreamEvent, operation: &'static str) -> Result<()> {
        let state = self.state.lock().await;
        if *state != SessionState::Active {
            return Err(Error::InvalidState {
                operation,
                state: state.name(),
            });
        }
        let payload = serde_json::to_vec(&StreamRequest::Event { event })?;
        self.transport.send(payload).await?;
        self.transport.flush().await?;
        debug!("sent {:?} event", event);
        Ok(())
    }

    /// Send one encoded audio frame.
    ///
    /// Audio loss is tolerated: a frame sent before the session is active is
    /// dropped with a log line, and a failed write is logged without closing
    /// the session, so later frames may still get through.
    pub async fn send_audio(&self, frame: Vec<u8>) -> Result<()> {
        let state = self.state.lock().await;
        if *state != SessionState::Active {
            debug!(
                "dropping {} byte audio frame; session is {}",
                frame.len(),
                state.name()
            );
            return Ok(());
        }
        let payload = serde_json::to_vec(&StreamRequest::audio(&frame))?;
        if let Err(e) = self.transport.send(payload).await {
            error!("audio frame write failed: {}", e);
        }
        Ok(())
    }

    /// Spawn the inbound loop, forwarding every response to `sink` until the
    /// stream ends. The loop never reconnects; once the transport reports
    /// end-of-stream it logs and exits.
    pub fn spawn_response_loop(&self, sink: Arc<dyn ResponseSink>) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            debug!("response loop started");
            while let Some(payload) = transport.next_inbound().await {
                match serde_json::from_slice::<serde_json::Value>(&payload) {
                    Ok(message) => sink.on_response(message).await,
                    Err(e) => warn!("discarding unparseable response: {}", e),
                }
            }
            info!("{}; response loop exiting", Error::StreamClosed);
        })
    }

    /// Close the session, settling in-flight writes. Terminal; safe from any
    /// state.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if *state == SessionState::Closed {
            return;
        }
        if *state != SessionState::Unopened {
            if let Err(e) = self.transport.close().await {
                warn!("transport close failed: {}", e);
            }
        }
        *state = SessionState::Closed;
        info!("stream session closed");
    }
}
