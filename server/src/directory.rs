//! Process-wide table of active lobbies
//!
//! The directory owns every [`Lobby`] and is the only place lobby codes are
//! handed out. It is owned by the single server task, so the check-and-insert
//! in [`LobbyDirectory::create`] can never race with another creation.

use log::info;
use rand::Rng;
use shared::{ConnectionId, LobbyCode};
use std::collections::HashMap;
use std::ops::RangeInclusive;

use crate::lobby::{Lobby, Player};

const CODE_RANGE: RangeInclusive<u16> = 1000..=9999;

/// A roster entry removed because its connection went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub code: LobbyCode,
    pub player: Player,
    /// The lobby was deleted because the roster became empty.
    pub lobby_deleted: bool,
}

#[derive(Debug, Default)]
pub struct LobbyDirectory {
    lobbies: HashMap<LobbyCode, Lobby>,
    next_session_id: u64,
}

impl LobbyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a lobby with the host as its only player and returns its code.
    ///
    /// Codes are drawn by rejection sampling against the active set. Returns
    /// None only when every four-digit code is in use.
    pub fn create<R: Rng + ?Sized>(
        &mut self,
        host_connection_id: ConnectionId,
        host_name: String,
        rng: &mut R,
    ) -> Option<LobbyCode> {
        if self.lobbies.len() >= CODE_RANGE.len() {
            return None;
        }

        let code = loop {
            let candidate = rng.gen_range(CODE_RANGE).to_string();
            if !self.lobbies.contains_key(&candidate) {
                break candidate;
            }
        };

        self.next_session_id += 1;
        let lobby = Lobby::new(
            code.clone(),
            self.next_session_id,
            host_connection_id,
            host_name,
        );
        self.lobbies.insert(code.clone(), lobby);
        Some(code)
    }

    pub fn get(&self, code: &str) -> Option<&Lobby> {
        self.lobbies.get(code)
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut Lobby> {
        self.lobbies.get_mut(code)
    }

    /// Looks up a lobby only if it is still the same session a timer was armed for.
    pub fn get_session_mut(&mut self, code: &str, session_id: u64) -> Option<&mut Lobby> {
        self.lobbies
            .get_mut(code)
            .filter(|lobby| lobby.session_id == session_id)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.lobbies.contains_key(code)
    }

    pub fn delete(&mut self, code: &str) -> Option<Lobby> {
        let removed = self.lobbies.remove(code);
        if removed.is_some() {
            info!("Lobby {} deleted", code);
            self.log_active_lobbies();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }

    pub fn codes(&self) -> Vec<LobbyCode> {
        let mut codes: Vec<LobbyCode> = self.lobbies.keys().cloned().collect();
        codes.sort();
        codes
    }

    /// The (lobby, player name) a connection is currently seated as, if any.
    pub fn binding_of(&self, connection_id: ConnectionId) -> Option<(LobbyCode, String)> {
        self.lobbies.values().find_map(|lobby| {
            lobby
                .name_of(connection_id)
                .map(|name| (lobby.code.clone(), name.to_string()))
        })
    }

    /// Removes every roster entry held by `connection_id`.
    ///
    /// Lobbies whose roster becomes empty are deleted whether or not a game
    /// is running; only the voluntary leave path protects in-game lobbies.
    pub fn remove_connection(&mut self, connection_id: ConnectionId) -> Vec<Departure> {
        let mut departures = Vec::new();

        for lobby in self.lobbies.values_mut() {
            if let Some(player) = lobby.remove_connection(connection_id) {
                info!(
                    "Player {} (connection {}) left lobby {}",
                    player.name, connection_id, lobby.code
                );
                departures.push(Departure {
                    code: lobby.code.clone(),
                    player,
                    lobby_deleted: lobby.is_empty(),
                });
            }
        }

        for departure in departures.iter().filter(|d| d.lobby_deleted) {
            self.delete(&departure.code);
        }

        departures
    }

    pub fn log_active_lobbies(&self) {
        if self.lobbies.is_empty() {
            info!("Active lobbies: None");
        } else {
            info!(
                "Active lobbies: {} ({})",
                self.lobbies.len(),
                self.codes().join(", ")
            );
        }
    }
}
