//! Per-turn actions: draw, discard, replace, skip and turn advancement
//!
//! Card identities reported by clients for discards and replacements are
//! trusted as-is; the server only keeps the shared deck, the discard pile
//! and the turn cursor consistent.

use log::debug;
use shared::{Card, ServerEvent};

use crate::config::Timings;
use crate::dispatch::{Dispatch, TimerEvent};
use crate::lobby::{DiscardEntry, Lobby};
use crate::policy::Rejection;

/// Moves the cursor to the next player and announces who plays now and after.
///
/// Does nothing until a spin has fixed the turn order.
pub fn advance_turn(lobby: &mut Lobby, dispatch: &mut Dispatch) {
    let len = lobby.turn_order.len();
    if len == 0 {
        debug!("Lobby {} has no turn order; not advancing", lobby.code);
        return;
    }

    lobby.turn_index = (lobby.turn_index + 1) % len;
    let current_player = lobby.turn_order[lobby.turn_index].clone();
    let next_player = lobby.turn_order[(lobby.turn_index + 1) % len].clone();

    dispatch.broadcast(
        lobby,
        ServerEvent::NextTurn {
            current_player,
            next_player,
        },
    );
}

/// Pops the top card for `player_name` and starts the draw animation.
///
/// The card is revealed to the player only when the
/// [`TimerEvent::RevealDrawnCard`] fires, and the lobby stays locked against
/// further draws until [`TimerEvent::ReleaseDrawLock`] fires after that.
pub fn draw(lobby: &mut Lobby, player_name: &str, timings: &Timings) -> Result<Dispatch, Rejection> {
    if lobby.has_drawn_card {
        return Err(Rejection::mismatch("a draw is already in progress"));
    }
    let card = lobby.deck.pop().ok_or(Rejection::DeckEmpty)?;
    lobby.has_drawn_card = true;

    let mut dispatch = Dispatch::new();
    dispatch.broadcast(
        lobby,
        ServerEvent::BroadcastDrawAnimation {
            player_name: player_name.to_string(),
        },
    );
    dispatch.schedule(
        timings.draw_reveal,
        TimerEvent::RevealDrawnCard {
            code: lobby.code.clone(),
            session_id: lobby.session_id,
            player_name: player_name.to_string(),
            card,
        },
    );
    Ok(dispatch)
}

pub fn reveal_drawn_card(lobby: &mut Lobby, player_name: &str, card: Card, timings: &Timings) -> Dispatch {
    let mut dispatch = Dispatch::new();

    if let Some(connection_id) = lobby.connection_of(player_name) {
        dispatch.send(
            connection_id,
            ServerEvent::ReceiveDrawnCard {
                card,
                player_name: player_name.to_string(),
            },
        );
    }
    dispatch.broadcast(lobby, lobby.card_count());
    dispatch.schedule(
        timings.draw_unlock,
        TimerEvent::ReleaseDrawLock {
            code: lobby.code.clone(),
            session_id: lobby.session_id,
        },
    );
    dispatch
}

pub fn release_draw_lock(lobby: &mut Lobby) {
    lobby.has_drawn_card = false;
}

fn push_discard(lobby: &mut Lobby, player_name: &str, card: Card, dispatch: &mut Dispatch) {
    lobby.discard_pile.push(DiscardEntry {
        player_name: player_name.to_string(),
        card,
    });
    dispatch.broadcast(
        lobby,
        ServerEvent::CardDiscarded {
            player_name: player_name.to_string(),
            card,
        },
    );
}

pub fn discard(lobby: &mut Lobby, player_name: &str, card: Card, animate_reverse: bool) -> Dispatch {
    let mut dispatch = Dispatch::new();
    push_discard(lobby, player_name, card, &mut dispatch);

    if animate_reverse {
        dispatch.broadcast(
            lobby,
            ServerEvent::ResetDeckScale {
                player_name: player_name.to_string(),
            },
        );
    }

    advance_turn(lobby, &mut dispatch);
    dispatch
}

pub fn replace(
    lobby: &mut Lobby,
    player_name: &str,
    replaced_card: Card,
    new_card: Card,
    replace_index: usize,
) -> Dispatch {
    let mut dispatch = Dispatch::new();
    push_discard(lobby, player_name, replaced_card, &mut dispatch);
    dispatch.broadcast(
        lobby,
        ServerEvent::UpdateReplacedCard {
            player_name: player_name.to_string(),
            replace_index,
            new_card,
        },
    );
    advance_turn(lobby, &mut dispatch);
    dispatch
}

pub fn skip(lobby: &mut Lobby, player_name: &str) -> Dispatch {
    let mut dispatch = Dispatch::new();
    advance_turn(lobby, &mut dispatch);
    dispatch.broadcast(
        lobby,
        ServerEvent::ShowLogMessage {
            message: format!("{} skipped their turn", player_name),
        },
    );
    dispatch
}

/// Advances after a client-side reverse animation finished.
pub fn reverse_animation_complete(lobby: &mut Lobby) -> Dispatch {
    let mut dispatch = Dispatch::new();
    advance_turn(lobby, &mut dispatch);
    dispatch
}
