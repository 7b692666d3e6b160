use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failures of the process and transport layer.
///
/// Protocol-level refusals never surface here; see [`crate::policy::Rejection`].
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("event codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
