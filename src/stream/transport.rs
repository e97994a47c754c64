use async_trait::async_trait;
use futures::stream::StreamExt;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Duplex byte transport under the session: one ordered outbound path and
/// one inbound message stream.
///
/// Credential attachment, TLS, and connection establishment are the
/// implementation's concern; the session only writes and reads payloads.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one outbound payload. Writes are delivered in call order.
    async fn send(&self, payload: Vec<u8>) -> Result<()>;

    /// Block until previously sent payloads are handed to the server.
    async fn flush(&self) -> Result<()>;

    /// Next inbound payload, or `None` once the stream has ended.
    async fn next_inbound(&self) -> Option<Vec<u8>>;

    /// Shut the transport down, settling in-flight writes first.
    async fn close(&self) -> Result<()>;
}

/// Connection parameters for [`NatsTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub server_url: String,
    pub token: String,
    pub stream_id: String,
    pub require_tls: bool,
}

/// Transport over a NATS connection.
///
/// Requests are published to `slu.v1.stream.{stream_id}`; responses arrive
/// on a subscription to `slu.v1.responses.{stream_id}`. The bearer token is
/// attached to every published message as an `Authorization` header.
pub struct NatsTransport {
    client: async_nats::Client,
    subject: String,
    headers: async_nats::HeaderMap,
    inbound: tokio::sync::Mutex<async_nats::Subscriber>,
}

impl NatsTransport {
    pub async fn connect(options: &TransportOptions) -> Result<Self> {
        info!("connecting to {}", options.server_url);

        let client = async_nats::ConnectOptions::new()
            .require_tls(options.require_tls)
            .connect(options.server_url.as_str())
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let inbound = client
            .subscribe(format!("slu.v1.responses.{}", options.stream_id))
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let mut headers = async_nats::HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Bearer {}", options.token).as_str(),
        );

        info!("connected (stream {})", options.stream_id);

        Ok(Self {
            client,
            subject: format!("slu.v1.stream.{}", options.stream_id),
            headers,
            inbound: tokio::sync::Mutex::new(inbound),
        })
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn send(&self, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish_with_headers(self.subject.clone(), self.headers.clone(), payload.into())
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }

    async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }

    async fn next_inbound(&self) -> Option<Vec<u8>> {
        let mut inbound = self.inbound.lock().await;
        inbound.next().await.map(|message| message.payload.to_vec())
    }

    async fn close(&self) -> Result<()> {
        debug!("closing transport");
        let _ = self.client.flush().await;
        self.inbound
            .lock()
            .await
            .unsubscribe()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }
}
