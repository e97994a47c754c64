use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::stream::messages::{LoginRequest, LoginResponse};

const LOGIN_SUBJECT: &str = "identity.v1.login";

/// Exchange app and device identity for a bearer token.
///
/// Performed once at startup over a request/reply round trip; the caller
/// caches the token for the process lifetime. Login rejection surfaces as
/// [`Error::Auth`], transport trouble as [`Error::Connection`]. No retry.
pub async fn login(server_url: &str, app_id: &str, device_id: &str) -> Result<String> {
    info!("logging in app {}", app_id);

    let client = async_nats::connect(server_url)
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    let request = LoginRequest {
        app_id: app_id.to_string(),
        device_id: device_id.to_string(),
    };
    let payload = serde_json::to_vec(&request)?;

    let reply = client
        .request(LOGIN_SUBJECT.to_string(), payload.into())
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    match serde_json::from_slice::<LoginResponse>(&reply.payload) {
        Ok(response) if !response.token.is_empty() => {
            debug!("token acquired ({} bytes)", response.token.len());
            Ok(response.token)
        }
        _ => Err(Error::Auth(
            String::from_utf8_lossy(&reply.payload).into_owned(),
        )),
    }
}
