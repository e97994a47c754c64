use base64::Engine;
use serde::{Deserialize, Serialize};

/// Outbound request on the stream, mirroring the service's request union.
///
/// Exactly one config message opens the stream; start/stop events bracket
/// each recording segment; audio messages carry base64 PCM between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamRequest {
    Config(StreamConfig),
    Event { event: StreamEvent },
    Audio { data: String },
}

impl StreamRequest {
    /// Wrap an encoded PCM frame as an audio message.
    pub fn audio(frame: &[u8]) -> Self {
        StreamRequest::Audio {
            data: base64::engine::general_purpose::STANDARD.encode(frame),
        }
    }
}

/// Stream configuration, written as the first outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    Linear16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEvent {
    Start,
    Stop,
}

/// Login request sent once to the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub app_id: String,
    pub device_id: String,
}

/// Identity service reply carrying the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}
