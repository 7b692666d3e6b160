//! Lobby session state and roster membership
//!
//! A [`Lobby`] is the aggregate root for one game room: roster, game mode,
//! deck, discard pile, turn order and the in-flight protocol state of
//! distribution, drawing and the acknowledgment barrier. All protocol
//! components mutate a lobby only through `&mut Lobby`, which the gateway
//! hands out one event at a time.

use shared::{Card, ConnectionId, LobbyCode, ServerEvent, DEFAULT_GAME_MODE};

use crate::distribution::Distribution;
use crate::turn_order::AckRound;

/// A seated participant. The name is the stable identity; the connection
/// id changes whenever the player reconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub connection_id: ConnectionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardEntry {
    pub player_name: String,
    pub card: Card,
}

#[derive(Debug)]
pub struct Lobby {
    pub code: LobbyCode,
    /// Unique per created lobby, never reused even when the code is.
    pub session_id: u64,
    pub host_connection_id: ConnectionId,
    /// Join order; also the seating order used for spins and distribution.
    pub roster: Vec<Player>,
    pub game_mode: String,
    pub in_game: bool,
    /// Draws pop from the end.
    pub deck: Vec<Card>,
    pub discard_pile: Vec<DiscardEntry>,
    pub turn_order: Vec<String>,
    pub turn_index: usize,
    /// Winner of the most recent spin.
    pub current_winner: Option<String>,
    pub has_drawn_card: bool,
    pub distribution: Option<Distribution>,
    pub ack_round: Option<AckRound>,
    distribution_epoch: u64,
}

impl Lobby {
    pub fn new(
        code: LobbyCode,
        session_id: u64,
        host_connection_id: ConnectionId,
        host_name: String,
    ) -> Self {
        Self {
            code,
            session_id,
            host_connection_id,
            roster: vec![Player {
                connection_id: host_connection_id,
                name: host_name,
            }],
            game_mode: DEFAULT_GAME_MODE.to_string(),
            in_game: false,
            deck: Vec::new(),
            discard_pile: Vec::new(),
            turn_order: Vec::new(),
            turn_index: 0,
            current_winner: None,
            has_drawn_card: false,
            distribution: None,
            ack_round: None,
            distribution_epoch: 0,
        }
    }

    /// Seats `name` under `connection_id` at the tail of the roster.
    ///
    /// An existing entry with the same name is removed first and returned,
    /// so a reconnecting player moves to the end of the seating order.
    pub fn join(&mut self, connection_id: ConnectionId, name: String) -> Option<Player> {
        let displaced = self.remove_player(&name);
        self.roster.push(Player {
            connection_id,
            name,
        });
        displaced
    }

    pub fn remove_player(&mut self, name: &str) -> Option<Player> {
        let index = self.roster.iter().position(|p| p.name == name)?;
        Some(self.roster.remove(index))
    }

    pub fn remove_connection(&mut self, connection_id: ConnectionId) -> Option<Player> {
        let index = self
            .roster
            .iter()
            .position(|p| p.connection_id == connection_id)?;
        Some(self.roster.remove(index))
    }

    pub fn connection_of(&self, name: &str) -> Option<ConnectionId> {
        self.roster
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.connection_id)
    }

    pub fn name_of(&self, connection_id: ConnectionId) -> Option<&str> {
        self.roster
            .iter()
            .find(|p| p.connection_id == connection_id)
            .map(|p| p.name.as_str())
    }

    pub fn player_names(&self) -> Vec<String> {
        self.roster.iter().map(|p| p.name.clone()).collect()
    }

    /// Connections subscribed to this lobby's broadcasts.
    pub fn room(&self) -> Vec<ConnectionId> {
        self.roster.iter().map(|p| p.connection_id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn is_host(&self, connection_id: ConnectionId) -> bool {
        self.host_connection_id == connection_id
    }

    /// True when `connection_id` holds the first seat.
    pub fn holds_first_seat(&self, connection_id: ConnectionId) -> bool {
        self.roster
            .first()
            .is_some_and(|p| p.connection_id == connection_id)
    }

    pub fn lobby_updated(&self) -> ServerEvent {
        ServerEvent::LobbyUpdated {
            players: self.player_names(),
            game_mode: self.game_mode.clone(),
        }
    }

    pub fn card_count(&self) -> ServerEvent {
        ServerEvent::UpdateCardCount {
            total_cards_remaining: self.deck.len(),
        }
    }

    pub(crate) fn next_distribution_epoch(&mut self) -> u64 {
        self.distribution_epoch += 1;
        self.distribution_epoch
    }
}
