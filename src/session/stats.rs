use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a streaming session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether recording is currently active
    pub is_recording: bool,

    /// When the session connected
    pub connected_at: DateTime<Utc>,

    /// Total session duration in seconds
    pub duration_secs: f64,

    /// Number of audio frames forwarded to the stream
    pub frames_sent: usize,

    /// Number of completed recording segments
    pub segments_completed: usize,
}
