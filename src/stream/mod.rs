pub mod messages;
pub mod session;
pub mod transport;

pub use session::{ResponseSink, StreamSession};
pub use transport::{NatsTransport, Transport, TransportOptions};
