use thiserror::Error;

/// Failures surfaced by the client.
///
/// Setup-time failures (device open, login, session open) are fatal and
/// propagate to the caller. Steady-state failures (a single audio write, a
/// single response iteration) are contained and logged where they occur.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no capture device available: {0}")]
    DeviceUnavailable(String),
    #[error("audio block of {0} samples exceeds the device buffer")]
    InvalidBlockSize(usize),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
    #[error("inbound stream closed")]
    StreamClosed,
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
