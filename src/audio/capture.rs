use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::audio::device::CaptureDevice;
use crate::error::{Error, Result};

/// Interval between device polls. Bounds both CPU usage and the worst-case
/// latency to observe a stop request.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Output of the capture loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// One poll's worth of raw signed 16-bit samples.
    Block(Vec<i16>),
    /// End of a recording segment. Emitted exactly once per stop, after the
    /// loop has observed the stop request.
    SegmentEnd,
}

/// Owns a capture device and produces [`CaptureEvent`]s while recording.
///
/// A polling task reads whatever samples the device has buffered every
/// [`POLL_INTERVAL`] and forwards them as blocks. The recording flag is the
/// only state shared with the controller; the poll task reads it each
/// iteration and winds down with a single segment-end sentinel when it flips
/// to idle.
pub struct AudioCapture {
    device: Arc<Mutex<Box<dyn CaptureDevice>>>,
    recording: Arc<AtomicBool>,
    events: mpsc::Sender<CaptureEvent>,
    poll_interval: Duration,
    poll_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl AudioCapture {
    pub fn new(
        device: Box<dyn CaptureDevice>,
        events: mpsc::Sender<CaptureEvent>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            recording: Arc::new(AtomicBool::new(false)),
            events,
            poll_interval,
            poll_task: tokio::sync::Mutex::new(None),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Begin capturing. No-op when already recording.
    pub async fn start(&self) -> Result<()> {
        if self.recording.load(Ordering::SeqCst) {
            debug!("capture already recording");
            return Ok(());
        }

        // Let the previous segment's poll task finish draining so its
        // sentinel cannot outlive the old segment.
        if let Some(previous) = self.poll_task.lock().await.take() {
            let _ = previous.await;
        }

        {
            let mut device = self
                .device
                .lock()
                .map_err(|_| Error::DeviceUnavailable("capture device lock poisoned".to_string()))?;
            device.start()?;
        }
        self.recording.store(true, Ordering::SeqCst);

        let recording = Arc::clone(&self.recording);
        let device = Arc::clone(&self.device);
        let events = self.events.clone();
        let poll_interval = self.poll_interval;

        let task = tokio::spawn(async move {
            debug!("capture poll loop started");
            loop {
                if !recording.load(Ordering::SeqCst) {
                    if events.send(CaptureEvent::SegmentEnd).await.is_err() {
                        warn!("capture sink dropped before segment end");
                    }
                    break;
                }

                let block = {
                    let mut device = match device.lock() {
                        Ok(device) => device,
                        Err(_) => break,
                    };
                    let available = device.available_samples();
                    if available > 0 {
                        Some(device.read_samples(available))
                    } else {
                        None
                    }
                };

                if let Some(block) = block {
                    if events.send(CaptureEvent::Block(block)).await.is_err() {
                        break;
                    }
                }

                tokio::time::sleep(poll_interval).await;
            }
            debug!("capture poll loop stopped");
        });

        *self.poll_task.lock().await = Some(task);
        Ok(())
    }

    /// Request capture to stop. Returns immediately; the poll loop observes
    /// the flag within one poll interval and emits its segment-end sentinel.
    pub fn stop(&self) {
        if !self.recording.swap(false, Ordering::SeqCst) {
            debug!("capture already idle");
            return;
        }
        if let Ok(mut device) = self.device.lock() {
            device.stop();
        }
    }

    /// Stop capture, join the poll task, and release the device. Safe to call
    /// without ever having started.
    pub async fn close(&self) {
        self.stop();
        if let Some(task) = self.poll_task.lock().await.take() {
            let _ = task.await;
        }
        if let Ok(mut device) = self.device.lock() {
            device.close();
        }
    }
}
