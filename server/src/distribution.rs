//! Acknowledgment-gated dealing of the opening hands
//!
//! Distribution is a per-lobby state machine. Starting it shuffles a fresh
//! deck and deals [`CARDS_PER_PLAYER`] cards to the first seated player, one
//! card per timer tick. Once that player's quota is dealt the process parks
//! in [`DealPhase::AwaitingAck`] until that same player confirms receipt;
//! only then does it move on to the next player.
//!
//! Each start takes a new epoch. Timers carry the epoch they were armed
//! with, so ticks left over from a replaced distribution do nothing.

use log::{debug, info};
use rand::Rng;
use shared::{Card, ServerEvent, CARDS_PER_PLAYER};
use std::collections::HashMap;

use crate::config::Timings;
use crate::deck;
use crate::dispatch::{Dispatch, TimerEvent};
use crate::lobby::Lobby;
use crate::policy::Rejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealPhase {
    /// Dealing to the current player; `dealt` cards handed out so far.
    Dealing { dealt: usize },
    /// Quota dealt; waiting for the current player's acknowledgment.
    AwaitingAck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub epoch: u64,
    /// Seating order captured at start.
    pub players: Vec<String>,
    pub hands: HashMap<String, Vec<Card>>,
    pub cursor: usize,
    pub phase: DealPhase,
}

impl Distribution {
    pub fn current_player(&self) -> Option<&str> {
        self.players.get(self.cursor).map(String::as_str)
    }
}

/// Shuffles a fresh deck onto the lobby and starts dealing to the first seat.
///
/// A distribution already in progress is discarded, not merged.
pub fn start<R: Rng + ?Sized>(lobby: &mut Lobby, rng: &mut R, timings: &Timings) -> Dispatch {
    if let Some(previous) = &lobby.distribution {
        info!(
            "Lobby {} restarting distribution (abandoning epoch {})",
            lobby.code, previous.epoch
        );
    }

    lobby.deck = deck::shuffled_deck(rng);
    let players = lobby.player_names();
    let epoch = lobby.next_distribution_epoch();

    let mut dispatch = Dispatch::new();
    if players.is_empty() {
        lobby.distribution = None;
        dispatch.broadcast(
            lobby,
            ServerEvent::AllCardsDistributed {
                lobby_code: lobby.code.clone(),
            },
        );
        return dispatch;
    }

    info!(
        "Lobby {} distributing to {} players (epoch {})",
        lobby.code,
        players.len(),
        epoch
    );

    lobby.distribution = Some(Distribution {
        epoch,
        hands: players.iter().map(|p| (p.clone(), Vec::new())).collect(),
        players,
        cursor: 0,
        phase: DealPhase::Dealing { dealt: 0 },
    });

    deal_next(lobby, timings, &mut dispatch);
    dispatch
}

/// Resumes dealing after a timer tick.
pub fn resume(lobby: &mut Lobby, epoch: u64, timings: &Timings) -> Result<Dispatch, Rejection> {
    match &lobby.distribution {
        Some(d) if d.epoch == epoch && matches!(d.phase, DealPhase::Dealing { .. }) => {}
        Some(d) if d.epoch != epoch => {
            return Err(Rejection::mismatch(format!(
                "deal tick for epoch {} but epoch {} is active",
                epoch, d.epoch
            )))
        }
        Some(_) => return Err(Rejection::mismatch("deal tick while awaiting acknowledgment")),
        None => return Err(Rejection::mismatch("deal tick without a distribution")),
    }

    let mut dispatch = Dispatch::new();
    deal_next(lobby, timings, &mut dispatch);
    Ok(dispatch)
}

/// Deals one card to the current player, then either arms the next tick or
/// tells the player their hand is complete.
fn deal_next(lobby: &mut Lobby, timings: &Timings, dispatch: &mut Dispatch) {
    let Some(distribution) = lobby.distribution.as_mut() else {
        return;
    };
    let DealPhase::Dealing { dealt } = distribution.phase else {
        return;
    };
    let Some(player) = distribution.current_player().map(str::to_string) else {
        return;
    };

    let mut dealt = dealt;
    let epoch = distribution.epoch;
    let card = lobby.deck.pop();

    if let Some(card) = card {
        distribution
            .hands
            .entry(player.clone())
            .or_default()
            .push(card);
        dealt += 1;
        debug!("Lobby {} dealt {} to {}", lobby.code, card, player);
    }

    let hand_complete = dealt >= CARDS_PER_PLAYER || lobby.deck.is_empty();
    distribution.phase = if hand_complete {
        DealPhase::AwaitingAck
    } else {
        DealPhase::Dealing { dealt }
    };

    if let Some(card) = card {
        dispatch.broadcast(
            lobby,
            ServerEvent::ReceiveCard {
                card,
                player_name: player.clone(),
            },
        );
        dispatch.broadcast(lobby, lobby.card_count());
    }

    if hand_complete {
        if let Some(connection_id) = lobby.connection_of(&player) {
            dispatch.send(connection_id, ServerEvent::AllCardsSent { player_name: player });
        }
    } else {
        dispatch.schedule(
            timings.card_interval,
            TimerEvent::DealNextCard {
                code: lobby.code.clone(),
                session_id: lobby.session_id,
                epoch,
            },
        );
    }
}

/// Accepts a receipt confirmation from the player currently being dealt to.
///
/// Confirmations from anyone else, before the hand is complete, or with no
/// distribution running are refused and leave the cursor where it is.
pub fn acknowledge(lobby: &mut Lobby, player_name: &str, timings: &Timings) -> Result<Dispatch, Rejection> {
    let distribution = lobby
        .distribution
        .as_mut()
        .ok_or_else(|| Rejection::mismatch("no distribution in progress"))?;

    if distribution.current_player() != Some(player_name) {
        return Err(Rejection::mismatch(format!(
            "{} acknowledged but {:?} is being dealt to",
            player_name,
            distribution.current_player()
        )));
    }
    if distribution.phase != DealPhase::AwaitingAck {
        return Err(Rejection::mismatch(format!(
            "{} acknowledged before the hand was complete",
            player_name
        )));
    }

    distribution.cursor += 1;
    let mut dispatch = Dispatch::new();

    if distribution.cursor < distribution.players.len() {
        distribution.phase = DealPhase::Dealing { dealt: 0 };
        let epoch = distribution.epoch;
        dispatch.schedule(
            timings.player_interval,
            TimerEvent::DealNextCard {
                code: lobby.code.clone(),
                session_id: lobby.session_id,
                epoch,
            },
        );
    } else {
        lobby.distribution = None;
        info!("Lobby {} distribution complete", lobby.code);
        dispatch.broadcast(
            lobby,
            ServerEvent::AllCardsDistributed {
                lobby_code: lobby.code.clone(),
            },
        );
    }

    Ok(dispatch)
}
