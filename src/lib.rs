pub mod audio;
pub mod config;
pub mod error;
pub mod identity;
pub mod session;
pub mod stream;

pub use audio::{
    encode_block, list_input_devices, AudioCapture, CaptureDevice, CaptureEvent, MicDevice,
    MAX_BLOCK_SAMPLES, POLL_INTERVAL,
};
pub use config::Config;
pub use error::{Error, Result};
pub use session::{SessionConfig, SessionController, SessionStats};
pub use stream::messages::{AudioEncoding, StreamConfig, StreamEvent, StreamRequest};
pub use stream::{NatsTransport, ResponseSink, StreamSession, Transport, TransportOptions};
