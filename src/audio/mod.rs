pub mod capture;
pub mod device;
pub mod encode;

pub use capture::{AudioCapture, CaptureEvent, POLL_INTERVAL};
pub use device::{list_input_devices, CaptureDevice, MicDevice};
pub use encode::{encode_block, MAX_BLOCK_SAMPLES};
