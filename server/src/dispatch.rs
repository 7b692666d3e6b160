//! Outbound events and deferred timers produced by handling one event
//!
//! Components never talk to sockets or sleep. They return a [`Dispatch`]
//! listing who receives which event and which [`TimerEvent`]s must be fed
//! back after a delay. The network layer performs the fan-out and arms the
//! timers; tests inspect the values directly and fire timers by hand.

use shared::{Card, ConnectionId, LobbyCode, ServerEvent};
use std::time::Duration;

use crate::lobby::Lobby;

/// One event and the connections it is addressed to.
///
/// Room broadcasts are resolved to connection ids at the moment they are
/// produced, so later membership changes in the same handler do not
/// affect who receives them.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipients: Vec<ConnectionId>,
    pub event: ServerEvent,
}

/// Continuation of a suspended step, delivered back to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Deal the next card of the active distribution.
    DealNextCard {
        code: LobbyCode,
        session_id: u64,
        epoch: u64,
    },
    /// Privately reveal a drawn card once the draw animation has played.
    RevealDrawnCard {
        code: LobbyCode,
        session_id: u64,
        player_name: String,
        card: Card,
    },
    /// Allow the next draw in the lobby.
    ReleaseDrawLock { code: LobbyCode, session_id: u64 },
}

impl TimerEvent {
    pub fn lobby(&self) -> (&str, u64) {
        match self {
            TimerEvent::DealNextCard {
                code, session_id, ..
            }
            | TimerEvent::RevealDrawnCard {
                code, session_id, ..
            }
            | TimerEvent::ReleaseDrawLock { code, session_id } => (code, *session_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled {
    pub delay: Duration,
    pub timer: TimerEvent,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Dispatch {
    pub outbound: Vec<Outbound>,
    pub timers: Vec<Scheduled>,
}

impl Dispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to every connection currently seated in the lobby.
    pub fn broadcast(&mut self, lobby: &Lobby, event: ServerEvent) {
        self.outbound.push(Outbound {
            recipients: lobby.room(),
            event,
        });
    }

    pub fn send(&mut self, connection_id: ConnectionId, event: ServerEvent) {
        self.outbound.push(Outbound {
            recipients: vec![connection_id],
            event,
        });
    }

    pub fn schedule(&mut self, delay: Duration, timer: TimerEvent) {
        self.timers.push(Scheduled { delay, timer });
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty() && self.timers.is_empty()
    }

    /// Events in emission order, ignoring recipients.
    pub fn events(&self) -> impl Iterator<Item = &ServerEvent> {
        self.outbound.iter().map(|o| &o.event)
    }

    /// Events addressed to `connection_id`, in emission order.
    pub fn events_for(&self, connection_id: ConnectionId) -> Vec<&ServerEvent> {
        self.outbound
            .iter()
            .filter(|o| o.recipients.contains(&connection_id))
            .map(|o| &o.event)
            .collect()
    }
}
