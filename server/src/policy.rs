//! Handling of refused requests
//!
//! The protocol has no error event: a refused request is observable to the
//! client only as "nothing happened". Every refusal is funnelled through
//! [`on_rejection`], so switching to explicit error replies touches only
//! this function.

use log::debug;
use shared::{ConnectionId, LobbyCode};
use thiserror::Error;

use crate::dispatch::Dispatch;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("lobby {0} does not exist")]
    LobbyNotFound(LobbyCode),

    #[error("connection {0} is not allowed to do this")]
    NotHost(ConnectionId),

    #[error("out of protocol order: {0}")]
    ProtocolMismatch(String),

    #[error("deck is empty")]
    DeckEmpty,

    #[error("missing field {0}")]
    MissingField(&'static str),
}

impl Rejection {
    pub fn mismatch(reason: impl Into<String>) -> Self {
        Rejection::ProtocolMismatch(reason.into())
    }
}

/// Decides what a refused request produces. Currently: a log line and nothing else.
pub fn on_rejection(event: &str, connection_id: Option<ConnectionId>, rejection: Rejection) -> Dispatch {
    match connection_id {
        Some(id) => debug!("Dropped {} from connection {}: {}", event, id, rejection),
        None => debug!("Dropped {}: {}", event, rejection),
    }
    Dispatch::new()
}
