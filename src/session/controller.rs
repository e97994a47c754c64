use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::audio::{encode_block, AudioCapture, CaptureDevice, CaptureEvent, MicDevice};
use crate::error::Result;
use crate::identity;
use crate::stream::messages::{AudioEncoding, StreamConfig};
use crate::stream::{NatsTransport, ResponseSink, StreamSession, Transport, TransportOptions};

/// Top-level orchestrator: one capture device, one stream session.
///
/// Owns the two long-lived background tasks beyond the capture poll loop:
/// the pump, which encodes capture blocks into audio writes and turns the
/// segment-end sentinel into the stop event, and the response loop. Both are
/// joined on shutdown so nothing outlives the controller.
pub struct SessionController {
    capture: AudioCapture,
    session: Arc<StreamSession>,
    pump_task: Option<JoinHandle<()>>,
    response_task: Option<JoinHandle<()>>,
    connected_at: chrono::DateTime<Utc>,
    frames_sent: Arc<AtomicUsize>,
    segments_completed: Arc<AtomicUsize>,
}

impl SessionController {
    /// Log in, connect the transport, and open a session on the microphone.
    pub async fn connect(config: SessionConfig, sink: Arc<dyn ResponseSink>) -> Result<Self> {
        let device_id = Uuid::new_v4().to_string();
        debug!("device id: {}", device_id);

        let token = identity::login(&config.server_url, &config.app_id, &device_id).await?;

        let stream_id = Uuid::new_v4().to_string();
        let transport = NatsTransport::connect(&TransportOptions {
            server_url: config.server_url.clone(),
            token,
            stream_id,
            require_tls: config.require_tls,
        })
        .await?;

        let device = MicDevice::open(
            config.input_device.as_deref(),
            config.sample_rate,
            config.channels,
        )?;

        Self::with_parts(Box::new(device), Arc::new(transport), config, sink).await
    }

    /// Assemble a controller from an already-open device and transport.
    ///
    /// This is the seam `connect` builds on: token acquisition and transport
    /// construction stay outside, so alternate credentials or transports plug
    /// in without touching the session logic.
    pub async fn with_parts(
        device: Box<dyn CaptureDevice>,
        transport: Arc<dyn Transport>,
        config: SessionConfig,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<Self> {
        let session = Arc::new(StreamSession::new(transport));
        session
            .open(StreamConfig {
                encoding: AudioEncoding::Linear16,
                sample_rate_hertz: config.sample_rate,
                language_code: config.language_code.clone(),
            })
            .await?;

        let response_task = session.spawn_response_loop(sink);

        let (events_tx, events_rx) = mpsc::channel(64);
        let capture = AudioCapture::new(device, events_tx, config.poll_interval);

        let frames_sent = Arc::new(AtomicUsize::new(0));
        let segments_completed = Arc::new(AtomicUsize::new(0));
        let pump_task = spawn_pump(
            Arc::clone(&session),
            events_rx,
            Arc::clone(&frames_sent),
            Arc::clone(&segments_completed),
        );

        info!("session controller ready");

        Ok(Self {
            capture,
            session,
            pump_task: Some(pump_task),
            response_task: Some(response_task),
            connected_at: Utc::now(),
            frames_sent,
            segments_completed,
        })
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_recording()
    }

    /// Begin a recording segment. No-op when already recording.
    ///
    /// The start event goes out before capture starts so the service never
    /// sees audio ahead of the segment it belongs to.
    pub async fn start(&self) -> Result<()> {
        if self.capture.is_recording() {
            debug!("already recording");
            return Ok(());
        }
        self.session.send_start().await?;
        self.capture.start().await?;
        info!("recording started");
        Ok(())
    }

    /// End the current recording segment. No-op when idle.
    ///
    /// Only capture is stopped here; the stop event is emitted by the pump
    /// once the capture loop has drained and sent its sentinel, so the
    /// service sees stop strictly after the segment's last audio frame.
    pub fn stop(&self) {
        if !self.capture.is_recording() {
            debug!("not recording");
            return;
        }
        self.capture.stop();
        info!("recording stopping");
    }

    /// Start or stop based on the current state. Rapid repeat invocation is
    /// safe; debouncing is the caller's concern.
    pub async fn toggle(&self) -> Result<()> {
        if self.is_recording() {
            self.stop();
            Ok(())
        } else {
            self.start().await
        }
    }

    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.connected_at);
        SessionStats {
            is_recording: self.is_recording(),
            connected_at: self.connected_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            segments_completed: self.segments_completed.load(Ordering::SeqCst),
        }
    }

    /// Tear everything down in dependency order: capture first (flushing the
    /// final sentinel), then the pump, then the session and response loop.
    pub async fn shutdown(self) -> Result<()> {
        let SessionController {
            capture,
            session,
            mut pump_task,
            mut response_task,
            ..
        } = self;

        capture.close().await;
        drop(capture); // closes the event channel so the pump drains and exits

        if let Some(pump) = pump_task.take() {
            if let Err(e) = pump.await {
                error!("pump task panicked: {}", e);
            }
        }

        session.close().await;

        if let Some(responses) = response_task.take() {
            if let Err(e) = responses.await {
                error!("response task panicked: {}", e);
            }
        }

        info!("session controller shut down");
        Ok(())
    }
}

/// Encode capture output into stream writes.
///
/// Blocks become audio frames; the segment-end sentinel becomes the stop
/// event. A failed stop write is logged rather than propagated since the
/// pump has no caller to hand it to.
fn spawn_pump(
    session: Arc<StreamSession>,
    mut events: mpsc::Receiver<CaptureEvent>,
    frames_sent: Arc<AtomicUsize>,
    segments_completed: Arc<AtomicUsize>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("audio pump started");
        while let Some(event) = events.recv().await {
            match event {
                CaptureEvent::Block(block) => match encode_block(&block) {
                    Ok(frame) => {
                        if session.send_audio(frame).await.is_ok() {
                            frames_sent.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    Err(e) => warn!("discarding capture block: {}", e),
                },
                CaptureEvent::SegmentEnd => {
                    if let Err(e) = session.send_stop().await {
                        error!("failed to send stop event: {}", e);
                    } else {
                        segments_completed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        }
        debug!("audio pump stopped");
    })
}
