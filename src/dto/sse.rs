use serde::Serialize;
use utoipa::ToSchema;

/// Named frame ready to be written to an SSE stream.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    pub name: &'static str,
    pub data: String,
}

impl ServerEvent {
    /// Serialise `payload` as the JSON data line of a `name` event.
    pub fn encode<T: Serialize>(name: &'static str, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            name,
            data: serde_json::to_string(payload)?,
        })
    }
}

/// First frame of a public stream.
#[derive(Debug, Serialize, ToSchema)]
pub struct Handshake {
    pub message: String,
    /// Whether storage is unavailable at subscription time.
    pub degraded: bool,
}

/// Broadcast when the backend enters or leaves degraded mode.
#[derive(Debug, Serialize, ToSchema)]
pub struct SystemStatus {
    pub degraded: bool,
}
