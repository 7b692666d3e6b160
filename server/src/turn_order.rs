//! Random starting player and the acknowledgment barrier that follows it

use log::info;
use rand::Rng;
use shared::{ConnectionId, ServerEvent};
use std::collections::HashSet;

use crate::dispatch::Dispatch;
use crate::lobby::Lobby;
use crate::policy::Rejection;

/// Acknowledgments collected for the latest spin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckRound {
    pub winner: String,
    pub acknowledged: HashSet<String>,
}

/// Seating order rotated so that `winner_index` leads.
pub fn rotate_from(names: &[String], winner_index: usize) -> Vec<String> {
    let mut order = names[winner_index..].to_vec();
    order.extend_from_slice(&names[..winner_index]);
    order
}

/// Draws the first player uniformly from the roster and fixes the turn order.
///
/// Only the connection in the first seat may spin. Any acknowledgment round
/// still open from an earlier spin is replaced.
pub fn spin<R: Rng + ?Sized>(
    lobby: &mut Lobby,
    requester: ConnectionId,
    rng: &mut R,
) -> Result<Dispatch, Rejection> {
    if !lobby.holds_first_seat(requester) {
        return Err(Rejection::NotHost(requester));
    }

    let players = lobby.player_names();
    let winner_index = rng.gen_range(0..players.len());
    let winner = players[winner_index].clone();
    let turn_order = rotate_from(&players, winner_index);

    lobby.turn_order = turn_order.clone();
    lobby.turn_index = 0;
    lobby.current_winner = Some(winner.clone());
    lobby.ack_round = Some(AckRound {
        winner: winner.clone(),
        acknowledged: HashSet::new(),
    });

    info!(
        "Lobby {} spin: {} starts, order {:?}",
        lobby.code, winner, turn_order
    );

    let mut dispatch = Dispatch::new();
    dispatch.broadcast(
        lobby,
        ServerEvent::WheelspinResult {
            winner,
            players,
            turn_order,
        },
    );
    Ok(dispatch)
}

/// Records that `name` saw the spin result.
///
/// The barrier opens once the number of distinct acknowledgments reaches the
/// roster size at the time of this call, so players joining or leaving
/// during the round move the bar.
pub fn acknowledge(lobby: &mut Lobby, name: &str) -> Result<Dispatch, Rejection> {
    let roster_size = lobby.roster.len();
    let round = lobby
        .ack_round
        .as_mut()
        .ok_or_else(|| Rejection::mismatch("no spin awaiting acknowledgment"))?;

    round.acknowledged.insert(name.to_string());
    if round.acknowledged.len() < roster_size {
        return Ok(Dispatch::new());
    }

    let winner = round.winner.clone();
    lobby.ack_round = None;
    info!("Lobby {} acknowledged spin, {} starts", lobby.code, winner);

    let mut dispatch = Dispatch::new();
    dispatch.broadcast(lobby, ServerEvent::AllAcknowledged { winner });
    Ok(dispatch)
}
