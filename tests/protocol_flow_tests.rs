//! End-to-end protocol flows driven through the gateway
//!
//! These tests play whole lobby sessions without sockets: client events go
//! straight into the gateway and timers are fired by hand, in the order the
//! server loop would fire them.

use server::config::Timings;
use server::dispatch::{Dispatch, Outbound, TimerEvent};
use server::gateway::Gateway;
use shared::{ClientEvent, ConnectionId, LobbyCode, ServerEvent, CARDS_PER_PLAYER, DECK_SIZE};
use std::collections::{HashSet, VecDeque};
use tokio_test::{assert_err, assert_ok};

/// Collects everything the gateway emitted during a session
struct Session {
    gateway: Gateway,
    log: Vec<Outbound>,
    pending: VecDeque<TimerEvent>,
}

impl Session {
    fn new(seed: u64) -> Self {
        Self {
            gateway: Gateway::with_seed(Timings::default(), seed),
            log: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn record(&mut self, dispatch: Dispatch) -> Dispatch {
        self.log.extend(dispatch.outbound.iter().cloned());
        self.pending
            .extend(dispatch.timers.iter().map(|scheduled| scheduled.timer.clone()));
        dispatch
    }

    fn send(&mut self, conn: ConnectionId, event: ClientEvent) -> Dispatch {
        let dispatch = self.gateway.handle(conn, event);
        self.record(dispatch)
    }

    /// Fires timers until none are left armed.
    fn run_timers(&mut self) {
        while let Some(timer) = self.pending.pop_front() {
            let dispatch = self.gateway.fire(timer);
            self.record(dispatch);
        }
    }

    fn received_by(&self, conn: ConnectionId) -> Vec<&ServerEvent> {
        self.log
            .iter()
            .filter(|o| o.recipients.contains(&conn))
            .map(|o| &o.event)
            .collect()
    }

    fn create(&mut self, conn: ConnectionId, name: &str) -> LobbyCode {
        let dispatch = self.send(
            conn,
            ClientEvent::CreateParty {
                player_name: Some(name.to_string()),
            },
        );
        match &dispatch.outbound[0].event {
            ServerEvent::PartyCreated { lobby_code } => lobby_code.clone(),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    fn join(&mut self, conn: ConnectionId, code: &str, name: &str) -> Dispatch {
        self.send(
            conn,
            ClientEvent::JoinParty {
                lobby_code: code.to_string(),
                player_name: name.to_string(),
            },
        )
    }
}

fn three_player_lobby(seed: u64) -> (Session, LobbyCode) {
    let mut session = Session::new(seed);
    let code = session.create(1, "Alice");
    session.join(2, &code, "Bob");
    session.join(3, &code, "Carol");
    (session, code)
}

/// LOBBY LIFECYCLE
mod lobby_tests {
    use super::*;

    #[test]
    fn create_join_and_start() {
        let (mut session, code) = three_player_lobby(1);

        let updated = session.received_by(1).into_iter().filter(|e| matches!(e, ServerEvent::LobbyUpdated { .. })).count();
        assert_eq!(updated, 3);

        let started = session.send(1, ClientEvent::StartGame { lobby_code: code.clone() });
        for conn in 1..=3 {
            assert_eq!(
                started.events_for(conn)[0],
                &ServerEvent::StartGame {
                    players: vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string()]
                }
            );
        }
        assert!(session.gateway.lobby(&code).unwrap().in_game);
    }

    #[test]
    fn check_lobby_exists_both_ways() {
        let mut session = Session::new(2);
        let code = session.create(1, "Alice");

        let valid = session.send(9, ClientEvent::CheckLobbyExists { lobby_code: code.clone() });
        assert_eq!(valid.events_for(9), vec![&ServerEvent::LobbyValid { lobby_code: code }]);

        let invalid = session.send(
            9,
            ClientEvent::CheckLobbyExists {
                lobby_code: "0042".to_string(),
            },
        );
        assert_eq!(
            invalid.events_for(9),
            vec![&ServerEvent::InvalidLobby {
                lobby_code: "0042".to_string()
            }]
        );
    }

    #[test]
    fn leave_is_refused_during_a_game() {
        let (mut session, code) = three_player_lobby(3);
        session.send(1, ClientEvent::StartGame { lobby_code: code.clone() });

        let refused = session.send(
            2,
            ClientEvent::LeaveLobby {
                lobby_code: code.clone(),
                player_name: "Bob".to_string(),
            },
        );
        assert!(refused.is_empty());
        assert_eq!(session.gateway.lobby(&code).unwrap().roster.len(), 3);
    }

    #[test]
    fn last_leave_deletes_lobby() {
        let mut session = Session::new(4);
        let code = session.create(1, "Alice");
        session.join(2, &code, "Bob");

        for (conn, name) in [(2, "Bob"), (1, "Alice")] {
            session.send(
                conn,
                ClientEvent::LeaveLobby {
                    lobby_code: code.clone(),
                    player_name: name.to_string(),
                },
            );
        }
        assert!(session.gateway.lobby(&code).is_none());
        assert!(session.gateway.directory().is_empty());
    }

    #[test]
    fn rejoin_moves_seat_to_new_connection() {
        let (mut session, code) = three_player_lobby(5);
        let dispatch = session.join(7, &code, "Bob");

        let lobby = session.gateway.lobby(&code).unwrap();
        assert_eq!(lobby.player_names(), vec!["Alice", "Carol", "Bob"]);
        assert_eq!(lobby.roster.len(), 3);
        assert_eq!(lobby.connection_of("Bob"), Some(7));
        assert_eq!(lobby.name_of(2), None);

        // The old connection is no longer part of the room
        assert_eq!(dispatch.outbound[0].recipients, vec![1, 3, 7]);
    }

    #[test]
    fn disconnect_deletes_emptied_lobby_even_in_game() {
        let mut session = Session::new(6);
        let code = session.create(1, "Alice");
        session.send(1, ClientEvent::StartGame { lobby_code: code.clone() });

        assert!(session.gateway.disconnect(1).is_empty());
        assert!(session.gateway.lobby(&code).is_none());
    }
}

/// SPIN AND ACKNOWLEDGMENT
mod spin_tests {
    use super::*;

    fn ack(session: &mut Session, conn: ConnectionId, code: &str, name: &str) -> Dispatch {
        session.send(
            conn,
            ClientEvent::WheelspinReceived {
                player_name: name.to_string(),
                lobby_code: code.to_string(),
            },
        )
    }

    #[test]
    fn barrier_opens_after_every_player() {
        let (mut session, code) = three_player_lobby(7);
        let spun = session.send(1, ClientEvent::SpinWheel { lobby_code: code.clone() });

        let (winner, order) = match &spun.outbound[0].event {
            ServerEvent::WheelspinResult {
                winner, turn_order, ..
            } => (winner.clone(), turn_order.clone()),
            other => panic!("Unexpected event: {:?}", other),
        };
        assert_eq!(order[0], winner);
        assert_eq!(order.len(), 3);

        assert!(ack(&mut session, 1, &code, "Alice").is_empty());
        // Duplicate acknowledgments count once
        assert!(ack(&mut session, 1, &code, "Alice").is_empty());
        assert!(ack(&mut session, 2, &code, "Bob").is_empty());

        let done = ack(&mut session, 3, &code, "Carol");
        assert_eq!(done.outbound[0].recipients, vec![1, 2, 3]);
        assert_eq!(done.outbound[0].event, ServerEvent::AllAcknowledged { winner });
    }

    #[test]
    fn leaver_lowers_the_bar() {
        let (mut session, code) = three_player_lobby(8);
        session.send(1, ClientEvent::SpinWheel { lobby_code: code.clone() });

        ack(&mut session, 1, &code, "Alice");
        session.send(
            3,
            ClientEvent::LeaveLobby {
                lobby_code: code.clone(),
                player_name: "Carol".to_string(),
            },
        );

        let done = ack(&mut session, 2, &code, "Bob");
        assert!(matches!(done.outbound[0].event, ServerEvent::AllAcknowledged { .. }));
        assert_eq!(done.outbound[0].recipients, vec![1, 2]);
    }

    #[test]
    fn only_first_seat_may_spin() {
        let (mut session, code) = three_player_lobby(9);
        assert!(session.send(2, ClientEvent::SpinWheel { lobby_code: code.clone() }).is_empty());
        assert!(session.gateway.lobby(&code).unwrap().current_winner.is_none());
    }
}

/// CARD DISTRIBUTION
mod distribution_tests {
    use super::*;

    fn cards_received(session: &mut Session, conn: ConnectionId, code: &str, name: &str) -> Dispatch {
        session.send(
            conn,
            ClientEvent::CardsReceived {
                lobby_code: code.to_string(),
                player_name: name.to_string(),
            },
        )
    }

    fn hand_of(session: &Session, name: &str) -> usize {
        session
            .log
            .iter()
            .filter(|o| matches!(&o.event, ServerEvent::ReceiveCard { player_name, .. } if player_name == name))
            .count()
    }

    #[test]
    fn deals_each_player_in_turn() {
        let (mut session, code) = three_player_lobby(10);
        session.send(1, ClientEvent::DistributeCards { lobby_code: code.clone() });
        session.run_timers();

        assert_eq!(hand_of(&session, "Alice"), CARDS_PER_PLAYER);
        assert_eq!(hand_of(&session, "Bob"), 0);
        assert!(session
            .received_by(1)
            .contains(&&ServerEvent::AllCardsSent {
                player_name: "Alice".to_string()
            }));

        for (conn, name) in [(1, "Alice"), (2, "Bob")] {
            let acked = cards_received(&mut session, conn, &code, name);
            assert!(!acked.timers.is_empty());
            session.run_timers();
        }
        assert_eq!(hand_of(&session, "Bob"), CARDS_PER_PLAYER);
        assert_eq!(hand_of(&session, "Carol"), CARDS_PER_PLAYER);

        let finished = cards_received(&mut session, 3, &code, "Carol");
        assert_eq!(
            finished.outbound[0].event,
            ServerEvent::AllCardsDistributed {
                lobby_code: code.clone()
            }
        );
        assert_eq!(finished.outbound[0].recipients, vec![1, 2, 3]);

        let lobby = session.gateway.lobby(&code).unwrap();
        assert_eq!(lobby.deck.len(), DECK_SIZE - 3 * CARDS_PER_PLAYER);
        assert!(lobby.distribution.is_none());
    }

    #[test]
    fn two_players_get_six_disjoint_cards() {
        let mut session = Session::new(16);
        let code = session.create(1, "Alice");
        session.join(2, &code, "Bob");
        session.log.clear();

        session.send(1, ClientEvent::DistributeCards { lobby_code: code.clone() });
        session.run_timers();
        cards_received(&mut session, 1, &code, "Alice");
        session.run_timers();
        cards_received(&mut session, 2, &code, "Bob");

        let mut dealt = Vec::new();
        let mut counts = Vec::new();
        let mut finished_at = None;
        for (position, outbound) in session.log.iter().enumerate() {
            match &outbound.event {
                ServerEvent::ReceiveCard { card, player_name } => dealt.push((player_name.clone(), *card)),
                ServerEvent::UpdateCardCount {
                    total_cards_remaining,
                } => counts.push(*total_cards_remaining),
                ServerEvent::AllCardsDistributed { .. } => finished_at = Some(position),
                _ => {}
            }
        }

        // Every card is dealt before completion is announced
        let finished_at = finished_at.expect("distribution never completed");
        let dealt_before_finish = session.log[..finished_at]
            .iter()
            .filter(|o| matches!(o.event, ServerEvent::ReceiveCard { .. }))
            .count();
        assert_eq!(dealt_before_finish, 6);

        assert_eq!(dealt.len(), 6);
        for name in ["Alice", "Bob"] {
            assert_eq!(dealt.iter().filter(|(p, _)| p == name).count(), CARDS_PER_PLAYER);
        }
        let distinct: HashSet<_> = dealt.iter().map(|(_, card)| *card).collect();
        assert_eq!(distinct.len(), 6);

        let expected: Vec<usize> = (DECK_SIZE - 6..DECK_SIZE).rev().collect();
        assert_eq!(counts, expected);
        assert_eq!(*counts.last().unwrap(), DECK_SIZE - 2 * CARDS_PER_PLAYER);
    }

    #[test]
    fn acknowledgment_from_wrong_player_is_ignored() {
        let (mut session, code) = three_player_lobby(11);
        session.send(1, ClientEvent::DistributeCards { lobby_code: code.clone() });
        session.run_timers();

        assert!(cards_received(&mut session, 2, &code, "Bob").is_empty());
        assert_eq!(session.gateway.lobby(&code).unwrap().distribution.as_ref().unwrap().cursor, 0);
    }

    #[test]
    fn restart_orphans_old_timers() {
        let (mut session, code) = three_player_lobby(12);
        let first = session.send(1, ClientEvent::DistributeCards { lobby_code: code.clone() });
        let stale = first.timers[0].timer.clone();

        session.pending.clear();
        session.send(1, ClientEvent::DistributeCards { lobby_code: code.clone() });

        assert!(session.gateway.fire(stale).is_empty());
        assert_eq!(session.gateway.lobby(&code).unwrap().deck.len(), DECK_SIZE - 1);
    }
}

/// TURN PLAY
mod turn_tests {
    use super::*;
    use shared::{Card, Rank, Suit};

    fn ready_table(seed: u64) -> (Session, LobbyCode) {
        let (mut session, code) = three_player_lobby(seed);
        session.send(1, ClientEvent::StartGame { lobby_code: code.clone() });
        session.send(1, ClientEvent::SpinWheel { lobby_code: code.clone() });
        session.send(1, ClientEvent::DistributeCards { lobby_code: code.clone() });
        session.run_timers();
        session.log.clear();
        (session, code)
    }

    #[test]
    fn draw_reveals_only_to_drawer() {
        let (mut session, code) = ready_table(13);
        let before = session.gateway.lobby(&code).unwrap().deck.len();

        let drawn = session.send(
            2,
            ClientEvent::DrawCard {
                lobby_code: code.clone(),
                player_name: "Bob".to_string(),
            },
        );
        assert_eq!(
            drawn.outbound[0].event,
            ServerEvent::BroadcastDrawAnimation {
                player_name: "Bob".to_string()
            }
        );
        assert!(session.gateway.lobby(&code).unwrap().has_drawn_card);

        session.run_timers();
        let private: Vec<_> = session
            .log
            .iter()
            .filter(|o| matches!(o.event, ServerEvent::ReceiveDrawnCard { .. }))
            .collect();
        assert_eq!(private.len(), 1);
        assert_eq!(private[0].recipients, vec![2]);

        let lobby = session.gateway.lobby(&code).unwrap();
        assert_eq!(lobby.deck.len(), before - 1);
        assert!(!lobby.has_drawn_card);
    }

    #[test]
    fn discard_and_skip_advance_turns() {
        let (mut session, code) = ready_table(14);
        let order = session.gateway.lobby(&code).unwrap().turn_order.clone();

        let discarded = session.send(
            1,
            ClientEvent::DiscardCard {
                lobby_code: code.clone(),
                player_name: order[0].clone(),
                card: Card::new(Rank::Queen, Suit::Clubs),
                animate_reverse: false,
            },
        );
        assert_eq!(
            discarded.outbound.last().unwrap().event,
            ServerEvent::NextTurn {
                current_player: order[1].clone(),
                next_player: order[2].clone(),
            }
        );

        let skipped = session.send(
            2,
            ClientEvent::SkipTurn {
                lobby_code: code.clone(),
                player_name: order[1].clone(),
            },
        );
        assert_eq!(
            skipped.outbound[0].event,
            ServerEvent::NextTurn {
                current_player: order[2].clone(),
                next_player: order[0].clone(),
            }
        );
        assert_eq!(session.gateway.lobby(&code).unwrap().discard_pile.len(), 1);
    }

    #[test]
    fn actions_on_missing_lobby_are_dropped() {
        let mut session = Session::new(15);
        let dispatch = session.send(
            1,
            ClientEvent::DrawCard {
                lobby_code: "9999".to_string(),
                player_name: "Ghost".to_string(),
            },
        );
        assert!(dispatch.is_empty());
    }
}

/// WIRE FORMAT
mod wire_tests {
    use super::*;

    #[test]
    fn inbound_frames_decode() {
        assert_ok!(ClientEvent::from_json(
            r#"{"event":"join_party","data":{"lobbyCode":"1234","playerName":"Bob"}}"#
        ));
        assert_ok!(ClientEvent::from_json(
            r#"{"event":"discard_card","data":{"lobbyCode":"1234","playerName":"Bob","card":{"rank":"K","suit":"♠"}}}"#
        ));
        assert_err!(ClientEvent::from_json(r#"{"event":"join_party","data":{"lobbyCode":"1234"}}"#));
    }

    #[test]
    fn spin_result_field_names() {
        let frame = ServerEvent::WheelspinResult {
            winner: "Bob".to_string(),
            players: vec!["Alice".to_string(), "Bob".to_string()],
            turn_order: vec!["Bob".to_string(), "Alice".to_string()],
        }
        .to_json()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["event"], "wheelspin_result");
        assert_eq!(value["data"]["turnOrder"][0], "Bob");
    }
}
