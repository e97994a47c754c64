use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a streaming session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Server URL for both the identity service and the stream transport
    pub server_url: String,

    /// Application identifier presented at login
    pub app_id: String,

    /// Optional recognition language, e.g. "en-US"
    pub language_code: Option<String>,

    /// Input device name; the host default when unset
    pub input_device: Option<String>,

    /// Sample rate for capture and the stream config (16kHz linear PCM)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Capture poll interval
    pub poll_interval: Duration,

    /// Require TLS on the stream transport
    pub require_tls: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: "nats://localhost:4222".to_string(),
            app_id: String::new(),
            language_code: None,
            input_device: None,
            sample_rate: 16000, // The service expects 16kHz linear PCM
            channels: 1,        // Mono
            poll_interval: crate::audio::POLL_INTERVAL,
            require_tls: false,
        }
    }
}
