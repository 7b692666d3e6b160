//! Event gateway: maps inbound client events and fired timers onto the
//! lobby components and collects the resulting outbound events
//!
//! The gateway owns the [`LobbyDirectory`] and the random source. It is
//! driven by exactly one task, which hands it one event at a time, so each
//! handler's read-modify-broadcast sequence runs without interleaving. The
//! only places other events can slip in are the timed continuations, which
//! re-validate lobby session and distribution epoch before acting.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ClientEvent, ConnectionId, LobbyCode, ServerEvent, UNKNOWN_PLAYER_NAME};

use crate::config::Timings;
use crate::directory::LobbyDirectory;
use crate::dispatch::{Dispatch, TimerEvent};
use crate::lobby::Lobby;
use crate::policy::{self, Rejection};
use crate::{distribution, turn, turn_order};

pub struct Gateway {
    directory: LobbyDirectory,
    rng: StdRng,
    timings: Timings,
}

impl Gateway {
    pub fn new(timings: Timings) -> Self {
        Self::with_rng(timings, StdRng::from_entropy())
    }

    /// Deterministic gateway for tests and replays.
    pub fn with_seed(timings: Timings, seed: u64) -> Self {
        Self::with_rng(timings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(timings: Timings, rng: StdRng) -> Self {
        Self {
            directory: LobbyDirectory::new(),
            rng,
            timings,
        }
    }

    pub fn directory(&self) -> &LobbyDirectory {
        &self.directory
    }

    pub fn lobby(&self, code: &str) -> Option<&Lobby> {
        self.directory.get(code)
    }

    /// Handles one inbound event from `connection_id` to completion.
    pub fn handle(&mut self, connection_id: ConnectionId, event: ClientEvent) -> Dispatch {
        let name = event.name();
        self.route(connection_id, event)
            .unwrap_or_else(|rejection| policy::on_rejection(name, Some(connection_id), rejection))
    }

    /// Resumes a suspended step. Timers for deleted or replaced lobbies do nothing.
    pub fn fire(&mut self, timer: TimerEvent) -> Dispatch {
        let label = match &timer {
            TimerEvent::DealNextCard { .. } => "deal_next_card",
            TimerEvent::RevealDrawnCard { .. } => "reveal_drawn_card",
            TimerEvent::ReleaseDrawLock { .. } => "release_draw_lock",
        };
        self.resume(timer)
            .unwrap_or_else(|rejection| policy::on_rejection(label, None, rejection))
    }

    /// Drops every roster entry held by a closed connection.
    ///
    /// Peers are not notified; they see the change with the next roster or
    /// turn broadcast.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Dispatch {
        let departures = self.directory.remove_connection(connection_id);
        if departures.is_empty() {
            info!("Connection {} closed without a lobby", connection_id);
        }
        Dispatch::new()
    }

    fn resume(&mut self, timer: TimerEvent) -> Result<Dispatch, Rejection> {
        let (code, session_id) = timer.lobby();
        let timings = self.timings;
        let lobby = self
            .directory
            .get_session_mut(code, session_id)
            .ok_or_else(|| Rejection::LobbyNotFound(code.to_string()))?;

        match timer {
            TimerEvent::DealNextCard { epoch, .. } => distribution::resume(lobby, epoch, &timings),
            TimerEvent::RevealDrawnCard {
                player_name, card, ..
            } => Ok(turn::reveal_drawn_card(lobby, &player_name, card, &timings)),
            TimerEvent::ReleaseDrawLock { .. } => {
                turn::release_draw_lock(lobby);
                Ok(Dispatch::new())
            }
        }
    }

    fn route(&mut self, conn: ConnectionId, event: ClientEvent) -> Result<Dispatch, Rejection> {
        match event {
            ClientEvent::CreateParty { player_name } => self.create_party(conn, player_name),
            ClientEvent::JoinParty {
                lobby_code,
                player_name,
            } => Ok(self.join_party(conn, lobby_code, player_name)),
            ClientEvent::CheckLobbyExists { lobby_code } => Ok(self.check_lobby_exists(conn, lobby_code)),
            ClientEvent::KickPlayer {
                lobby_code,
                player_name,
            } => self.kick_player(conn, &lobby_code, &player_name),
            ClientEvent::ChangeGameMode {
                lobby_code,
                game_mode,
            } => self.change_game_mode(conn, &lobby_code, game_mode),
            ClientEvent::LeaveLobby {
                lobby_code,
                player_name,
            } => self.leave_lobby(&lobby_code, &player_name),
            ClientEvent::DeleteParty { lobby_code } => self.delete_party(&lobby_code),
            ClientEvent::StartGame { lobby_code } => self.start_game(conn, &lobby_code),
            ClientEvent::GetPlayerName { lobby_code } => self.get_player_name(conn, &lobby_code),
            ClientEvent::DistributeCards { lobby_code } => {
                let timings = self.timings;
                let lobby = Self::lobby_mut(&mut self.directory, &lobby_code)?;
                Ok(distribution::start(lobby, &mut self.rng, &timings))
            }
            ClientEvent::CardsReceived {
                lobby_code,
                player_name,
            } => {
                let timings = self.timings;
                let lobby = Self::lobby_mut(&mut self.directory, &lobby_code)?;
                distribution::acknowledge(lobby, &player_name, &timings)
            }
            ClientEvent::SpinWheel { lobby_code } => {
                let lobby = Self::lobby_mut(&mut self.directory, &lobby_code)?;
                turn_order::spin(lobby, conn, &mut self.rng)
            }
            ClientEvent::WheelspinReceived {
                player_name,
                lobby_code,
            } => {
                let lobby = Self::lobby_mut(&mut self.directory, &lobby_code)?;
                turn_order::acknowledge(lobby, &player_name)
            }
            ClientEvent::RequestCurrentState { lobby_code } => {
                let lobby = Self::lobby_mut(&mut self.directory, &lobby_code)?;
                let mut dispatch = Dispatch::new();
                dispatch.send(
                    conn,
                    ServerEvent::CurrentGameState {
                        current_winner: lobby.current_winner.clone(),
                        players: lobby.player_names(),
                    },
                );
                Ok(dispatch)
            }
            ClientEvent::DrawCard {
                lobby_code,
                player_name,
            } => {
                let timings = self.timings;
                let lobby = Self::lobby_mut(&mut self.directory, &lobby_code)?;
                turn::draw(lobby, &player_name, &timings)
            }
            ClientEvent::DiscardCard {
                lobby_code,
                player_name,
                card,
                animate_reverse,
            } => {
                let lobby = Self::lobby_mut(&mut self.directory, &lobby_code)?;
                Ok(turn::discard(lobby, &player_name, card, animate_reverse))
            }
            ClientEvent::ReplaceCard {
                lobby_code,
                player_name,
                replaced_card,
                new_card,
                replace_index,
            } => {
                let lobby = Self::lobby_mut(&mut self.directory, &lobby_code)?;
                Ok(turn::replace(lobby, &player_name, replaced_card, new_card, replace_index))
            }
            ClientEvent::SkipTurn {
                lobby_code,
                player_name,
            } => {
                let lobby = Self::lobby_mut(&mut self.directory, &lobby_code)?;
                Ok(turn::skip(lobby, &player_name))
            }
            ClientEvent::ReverseAnimationComplete { lobby_code, .. } => {
                let lobby = Self::lobby_mut(&mut self.directory, &lobby_code)?;
                Ok(turn::reverse_animation_complete(lobby))
            }
            ClientEvent::ResetDeckScale {
                lobby_code,
                player_name,
            } => self.relay(&lobby_code, ServerEvent::ResetDeckScale { player_name }),
            ClientEvent::DiscardPileCardSelected { lobby_code, card } => {
                self.relay(&lobby_code, ServerEvent::HighlightDiscardedCard { card })
            }
            ClientEvent::ResetDiscardedCard { lobby_code } => {
                self.relay(&lobby_code, ServerEvent::ResetDiscardedCard {})
            }
            ClientEvent::FlipCardBack {
                lobby_code,
                player_name,
                replace_index,
                was_drawn_from_deck,
            } => self.relay(
                &lobby_code,
                ServerEvent::FlipCardBack {
                    player_name,
                    replace_index,
                    was_drawn_from_deck,
                },
            ),
        }
    }

    fn lobby_mut<'a>(directory: &'a mut LobbyDirectory, code: &str) -> Result<&'a mut Lobby, Rejection> {
        directory
            .get_mut(code)
            .ok_or_else(|| Rejection::LobbyNotFound(code.to_string()))
    }

    fn relay(&mut self, code: &str, event: ServerEvent) -> Result<Dispatch, Rejection> {
        let lobby = Self::lobby_mut(&mut self.directory, code)?;
        let mut dispatch = Dispatch::new();
        dispatch.broadcast(lobby, event);
        Ok(dispatch)
    }

    /// Unseats `conn` from a lobby other than (`code`, `name`) before it takes a new seat.
    fn release_previous_seat(&mut self, conn: ConnectionId, code: Option<&str>, name: &str) -> Dispatch {
        let mut dispatch = Dispatch::new();
        let Some((old_code, old_name)) = self.directory.binding_of(conn) else {
            return dispatch;
        };
        if code == Some(old_code.as_str()) && old_name == name {
            return dispatch;
        }

        if let Some(lobby) = self.directory.get_mut(&old_code) {
            lobby.remove_connection(conn);
            if code == Some(old_code.as_str()) {
                // Re-seated under the new name by the caller right away
                info!("Connection {} renamed from {} in lobby {}", conn, old_name, old_code);
                return dispatch;
            }
            info!(
                "Connection {} moved away from lobby {} (was {})",
                conn, old_code, old_name
            );
            if lobby.is_empty() {
                self.directory.delete(&old_code);
            } else {
                dispatch.broadcast(lobby, lobby.lobby_updated());
            }
        }
        dispatch
    }

    fn create_party(&mut self, conn: ConnectionId, player_name: Option<String>) -> Result<Dispatch, Rejection> {
        let player_name = player_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_PLAYER_NAME.to_string());

        let mut dispatch = self.release_previous_seat(conn, None, &player_name);
        let Some(code) = self.directory.create(conn, player_name.clone(), &mut self.rng) else {
            warn!("No free lobby codes; refusing create_party from {}", conn);
            return Err(Rejection::mismatch("all lobby codes in use"));
        };

        info!("Lobby created: {} by connection {} ({})", code, conn, player_name);
        self.directory.log_active_lobbies();

        let lobby = Self::lobby_mut(&mut self.directory, &code)?;
        dispatch.send(conn, ServerEvent::PartyCreated { lobby_code: code.clone() });
        dispatch.broadcast(lobby, lobby.lobby_updated());
        Ok(dispatch)
    }

    fn join_party(&mut self, conn: ConnectionId, code: LobbyCode, player_name: String) -> Dispatch {
        if !self.directory.contains(&code) {
            info!("Join to missing lobby {} from connection {}", code, conn);
            let mut dispatch = Dispatch::new();
            dispatch.send(conn, ServerEvent::InvalidLobby { lobby_code: code });
            return dispatch;
        }

        let mut dispatch = self.release_previous_seat(conn, Some(&code), &player_name);
        let Some(lobby) = self.directory.get_mut(&code) else {
            dispatch.send(conn, ServerEvent::InvalidLobby { lobby_code: code });
            return dispatch;
        };

        if let Some(previous) = lobby.join(conn, player_name.clone()) {
            info!(
                "{} rejoined lobby {} (connection {} replaces {})",
                player_name, code, conn, previous.connection_id
            );
        } else {
            info!("{} joined lobby {}", player_name, code);
        }

        dispatch.broadcast(lobby, lobby.lobby_updated());
        dispatch.send(conn, ServerEvent::LobbyJoinSuccess { lobby_code: code });
        dispatch
    }

    fn check_lobby_exists(&self, conn: ConnectionId, code: LobbyCode) -> Dispatch {
        let mut dispatch = Dispatch::new();
        let event = if self.directory.contains(&code) {
            ServerEvent::LobbyValid { lobby_code: code }
        } else {
            ServerEvent::InvalidLobby { lobby_code: code }
        };
        dispatch.send(conn, event);
        dispatch
    }

    fn kick_player(&mut self, conn: ConnectionId, code: &str, player_name: &str) -> Result<Dispatch, Rejection> {
        let lobby = Self::lobby_mut(&mut self.directory, code)?;
        if !lobby.is_host(conn) {
            return Err(Rejection::NotHost(conn));
        }
        let kicked = lobby
            .remove_player(player_name)
            .ok_or_else(|| Rejection::mismatch(format!("{} is not in lobby {}", player_name, code)))?;
        info!("{} kicked from lobby {}", player_name, code);

        let mut dispatch = Dispatch::new();
        dispatch.broadcast(lobby, lobby.lobby_updated());
        dispatch.send(
            kicked.connection_id,
            ServerEvent::PlayerKicked {
                player_name: kicked.name,
            },
        );

        if lobby.is_empty() && !lobby.in_game {
            self.directory.delete(code);
        }
        Ok(dispatch)
    }

    fn change_game_mode(
        &mut self,
        conn: ConnectionId,
        code: &str,
        game_mode: Option<String>,
    ) -> Result<Dispatch, Rejection> {
        let lobby = Self::lobby_mut(&mut self.directory, code)?;
        if !lobby.is_host(conn) {
            return Err(Rejection::NotHost(conn));
        }
        let game_mode = game_mode
            .filter(|m| !m.is_empty())
            .ok_or(Rejection::MissingField("gameMode"))?;

        info!("Game mode changed to {} for lobby {}", game_mode, code);
        lobby.game_mode = game_mode;

        let mut dispatch = Dispatch::new();
        dispatch.broadcast(lobby, lobby.lobby_updated());
        Ok(dispatch)
    }

    fn leave_lobby(&mut self, code: &str, player_name: &str) -> Result<Dispatch, Rejection> {
        let lobby = Self::lobby_mut(&mut self.directory, code)?;
        if lobby.in_game {
            return Err(Rejection::mismatch(format!(
                "{} cannot leave lobby {} during a game",
                player_name, code
            )));
        }

        if lobby.remove_player(player_name).is_some() {
            info!("{} left lobby {}", player_name, code);
        }

        let mut dispatch = Dispatch::new();
        if lobby.is_empty() {
            self.directory.delete(code);
        } else {
            dispatch.broadcast(lobby, lobby.lobby_updated());
        }
        Ok(dispatch)
    }

    fn delete_party(&mut self, code: &str) -> Result<Dispatch, Rejection> {
        let lobby = Self::lobby_mut(&mut self.directory, code)?;
        let mut dispatch = Dispatch::new();
        dispatch.broadcast(
            lobby,
            ServerEvent::PartyClosed {
                lobby_code: code.to_string(),
            },
        );
        self.directory.delete(code);
        Ok(dispatch)
    }

    fn start_game(&mut self, conn: ConnectionId, code: &str) -> Result<Dispatch, Rejection> {
        let lobby = Self::lobby_mut(&mut self.directory, code)?;
        if !lobby.is_host(conn) {
            return Err(Rejection::NotHost(conn));
        }
        lobby.in_game = true;
        info!("Game started in lobby {}", code);

        let players = lobby.player_names();
        let mut dispatch = Dispatch::new();
        for connection_id in lobby.room() {
            dispatch.send(
                connection_id,
                ServerEvent::StartGame {
                    players: players.clone(),
                },
            );
        }
        dispatch.broadcast(lobby, lobby.lobby_updated());
        Ok(dispatch)
    }

    fn get_player_name(&mut self, conn: ConnectionId, code: &str) -> Result<Dispatch, Rejection> {
        let lobby = Self::lobby_mut(&mut self.directory, code)?;
        let player_name = lobby
            .name_of(conn)
            .ok_or_else(|| Rejection::mismatch(format!("connection {} is not seated in {}", conn, code)))?
            .to_string();

        let mut dispatch = Dispatch::new();
        dispatch.send(conn, ServerEvent::PlayerName { player_name });
        Ok(dispatch)
    }
}
