use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Boundary over an open audio input device.
///
/// Pull-style interface: the capture loop asks how many samples are waiting
/// and reads exactly that many. `start`/`stop` gate whether the device feeds
/// its buffer; `close` releases the device and must be safe to call even if
/// capture never started.
pub trait CaptureDevice: Send {
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    /// Number of samples currently buffered and ready to read.
    fn available_samples(&self) -> usize;

    /// Read up to `count` buffered samples.
    fn read_samples(&mut self, count: usize) -> Vec<i16>;

    fn close(&mut self);
}

/// List microphone names so the CLI can expose a selector.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
    let mut names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            names.push(name);
        }
    }
    Ok(names)
}

enum DeviceCommand {
    Resume,
    Pause,
    Shutdown,
}

/// Microphone input via cpal.
///
/// The cpal stream is not `Send`, so it lives on a dedicated audio thread for
/// the device's lifetime. The stream callback appends signed 16-bit samples
/// into a ring buffer holding one second of audio; older samples are dropped
/// on overflow. The gate flag is authoritative for whether samples are kept,
/// so a backend that cannot pause still behaves correctly.
pub struct MicDevice {
    name: String,
    ring: Arc<Mutex<VecDeque<i16>>>,
    gate: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
    commands: mpsc::Sender<DeviceCommand>,
    audio_thread: Option<thread::JoinHandle<()>>,
}

impl MicDevice {
    /// Open the named input device, or the host default when none is named.
    ///
    /// The device is configured for `channels`-channel signed 16-bit PCM at
    /// `sample_rate` Hz with a one second ring buffer. Fails with
    /// [`Error::DeviceUnavailable`] when no usable device exists.
    pub fn open(preferred: Option<&str>, sample_rate: u32, channels: u16) -> Result<Self> {
        let capacity = sample_rate as usize * channels as usize;
        let ring = Arc::new(Mutex::new(VecDeque::with_capacity(capacity)));
        let gate = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicUsize::new(0));
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let preferred = preferred.map(str::to_owned);
        let thread_ring = Arc::clone(&ring);
        let thread_gate = Arc::clone(&gate);
        let thread_dropped = Arc::clone(&dropped);

        let audio_thread = thread::Builder::new()
            .name("slu-audio".to_string())
            .spawn(move || {
                audio_thread_main(
                    preferred,
                    sample_rate,
                    channels,
                    capacity,
                    thread_ring,
                    thread_gate,
                    thread_dropped,
                    command_rx,
                    ready_tx,
                )
            })
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(name)) => {
                info!("capture device opened: {} ({}Hz, {} channels)", name, sample_rate, channels);
                Ok(Self {
                    name,
                    ring,
                    gate,
                    dropped,
                    commands: command_tx,
                    audio_thread: Some(audio_thread),
                })
            }
            Ok(Err(e)) => {
                let _ = audio_thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = audio_thread.join();
                Err(Error::DeviceUnavailable(
                    "audio thread exited before reporting a device".to_string(),
                ))
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CaptureDevice for MicDevice {
    fn start(&mut self) -> Result<()> {
        // Fresh segment: discard anything buffered while the gate was closed.
        if let Ok(mut ring) = self.ring.lock() {
            ring.clear();
        }
        self.dropped.store(0, Ordering::Relaxed);
        self.gate.store(true, Ordering::SeqCst);
        self.commands
            .send(DeviceCommand::Resume)
            .map_err(|_| Error::DeviceUnavailable("audio thread is gone".to_string()))
    }

    fn stop(&mut self) {
        self.gate.store(false, Ordering::SeqCst);
        let _ = self.commands.send(DeviceCommand::Pause);
        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!("capture ring buffer overflowed; {} samples dropped", dropped);
        }
    }

    fn available_samples(&self) -> usize {
        self.ring.lock().map(|ring| ring.len()).unwrap_or(0)
    }

    fn read_samples(&mut self, count: usize) -> Vec<i16> {
        match self.ring.lock() {
            Ok(mut ring) => {
                let take = count.min(ring.len());
                ring.drain(..take).collect()
            }
            Err(_) => Vec::new(),
        }
    }

    fn close(&mut self) {
        self.gate.store(false, Ordering::SeqCst);
        let _ = self.commands.send(DeviceCommand::Shutdown);
        if let Some(handle) = self.audio_thread.take() {
            let _ = handle.join();
        }
        debug!("capture device closed: {}", self.name);
    }
}

#[allow(clippy::too_many_arguments)]
fn audio_thread_main(
    preferred: Option<String>,
    sample_rate: u32,
    channels: u16,
    capacity: usize,
    ring: Arc<Mutex<VecDeque<i16>>>,
    gate: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
    commands: mpsc::Receiver<DeviceCommand>,
    ready: mpsc::Sender<std::result::Result<String, Error>>,
) {
    let open_stream = || -> Result<(cpal::Stream, String)> {
        let host = cpal::default_host();
        let device = match &preferred {
            Some(name) => {
                let mut devices = host
                    .input_devices()
                    .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
                devices
                    .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                    .ok_or_else(|| {
                        Error::DeviceUnavailable(format!("input device '{}' not found", name))
                    })?
            }
            None => host.default_input_device().ok_or_else(|| {
                Error::DeviceUnavailable(format!(
                    "no default input device. {}",
                    mic_permission_hint()
                ))
            })?,
        };
        let name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());

        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_fn = |err| warn!("audio stream error: {}", err);
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if !gate.load(Ordering::Relaxed) {
                        return;
                    }
                    if let Ok(mut ring) = ring.lock() {
                        for &sample in data {
                            if ring.len() == capacity {
                                ring.pop_front();
                                dropped.fetch_add(1, Ordering::Relaxed);
                            }
                            ring.push_back(sample);
                        }
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                Error::DeviceUnavailable(format!(
                    "failed to open capture stream on '{}': {}",
                    name, e
                ))
            })?;

        Ok((stream, name))
    };

    let (stream, name) = match open_stream() {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(name));

    // Hold the stream here until shutdown; play/pause are best effort since
    // not every backend supports pausing.
    while let Ok(command) = commands.recv() {
        match command {
            DeviceCommand::Resume => {
                if let Err(e) = stream.play() {
                    warn!("failed to start capture stream: {}", e);
                }
            }
            DeviceCommand::Pause => {
                if let Err(e) = stream.pause() {
                    debug!("failed to pause capture stream: {}", e);
                }
            }
            DeviceCommand::Shutdown => break,
        }
    }
    drop(stream);
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}
