//! Scripted lobby client for manual testing against a running server.
//!
//! With no `--code` it creates a party, waits for `--players` seats, starts
//! the game, spins and deals. With `--code` it joins that lobby. Either way
//! it acknowledges spins and deals automatically and plays `--turns` turns
//! by drawing a card and discarding it straight away.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use shared::{ClientEvent, LobbyCode, ServerEvent};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server WebSocket URL
    #[clap(short, long, default_value = "ws://127.0.0.1:3000")]
    url: String,
    /// Player name
    #[clap(short, long, default_value = "Tester")]
    name: String,
    /// Lobby to join; creates a new one when omitted
    #[clap(short, long)]
    code: Option<LobbyCode>,
    /// Seats to wait for before the host starts the game
    #[clap(short, long, default_value = "2")]
    players: usize,
    /// Turns to play before going idle
    #[clap(short, long, default_value = "3")]
    turns: usize,
    /// Seconds to run before disconnecting
    #[clap(short, long, default_value = "60")]
    duration: u64,
}

struct Bot {
    name: String,
    is_host: bool,
    wanted_players: usize,
    lobby_code: Option<LobbyCode>,
    started: bool,
    turn_order: Vec<String>,
    turns_left: usize,
}

impl Bot {
    fn code(&self) -> LobbyCode {
        self.lobby_code.clone().unwrap_or_default()
    }

    fn draw(&mut self) -> Vec<ClientEvent> {
        if self.turns_left == 0 {
            return Vec::new();
        }
        vec![ClientEvent::DrawCard {
            lobby_code: self.code(),
            player_name: self.name.clone(),
        }]
    }

    /// Returns the events to send in response, and whether to stop.
    fn react(&mut self, event: ServerEvent) -> (Vec<ClientEvent>, bool) {
        let replies = match event {
            ServerEvent::PartyCreated { lobby_code } | ServerEvent::LobbyJoinSuccess { lobby_code } => {
                println!("Seated in lobby {}", lobby_code);
                self.lobby_code = Some(lobby_code);
                Vec::new()
            }
            ServerEvent::LobbyUpdated { players, .. } => {
                if self.is_host && !self.started && players.len() >= self.wanted_players {
                    self.started = true;
                    vec![
                        ClientEvent::StartGame {
                            lobby_code: self.code(),
                        },
                        ClientEvent::SpinWheel {
                            lobby_code: self.code(),
                        },
                    ]
                } else {
                    Vec::new()
                }
            }
            ServerEvent::WheelspinResult { turn_order, .. } => {
                self.turn_order = turn_order;
                vec![ClientEvent::WheelspinReceived {
                    player_name: self.name.clone(),
                    lobby_code: self.code(),
                }]
            }
            ServerEvent::AllAcknowledged { .. } if self.is_host => vec![ClientEvent::DistributeCards {
                lobby_code: self.code(),
            }],
            ServerEvent::AllCardsSent { player_name } if player_name == self.name => {
                vec![ClientEvent::CardsReceived {
                    lobby_code: self.code(),
                    player_name,
                }]
            }
            ServerEvent::AllCardsDistributed { .. } if self.turn_order.first() == Some(&self.name) => self.draw(),
            ServerEvent::NextTurn { current_player, .. } if current_player == self.name => self.draw(),
            ServerEvent::ReceiveDrawnCard { card, player_name } => {
                self.turns_left = self.turns_left.saturating_sub(1);
                vec![ClientEvent::DiscardCard {
                    lobby_code: self.code(),
                    player_name,
                    card,
                    animate_reverse: false,
                }]
            }
            ServerEvent::PartyClosed { .. } => return (Vec::new(), true),
            ServerEvent::PlayerKicked { player_name } if player_name == self.name => return (Vec::new(), true),
            _ => Vec::new(),
        };
        (replies, false)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Connecting to {}", args.url);
    let (stream, _) = connect_async(args.url.as_str()).await?;
    let (mut sink, mut source) = stream.split();

    let mut bot = Bot {
        name: args.name.clone(),
        is_host: args.code.is_none(),
        wanted_players: args.players,
        lobby_code: args.code.clone(),
        started: false,
        turn_order: Vec::new(),
        turns_left: args.turns,
    };

    let opening = match args.code {
        Some(lobby_code) => ClientEvent::JoinParty {
            lobby_code,
            player_name: args.name,
        },
        None => ClientEvent::CreateParty {
            player_name: Some(args.name),
        },
    };
    sink.send(Message::text(opening.to_json()?)).await?;

    let deadline = tokio::time::sleep(Duration::from_secs(args.duration));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            message = source.next() => {
                let text = match message {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        println!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };

                let event = match ServerEvent::from_json(text.as_str()) {
                    Ok(event) => event,
                    Err(e) => {
                        println!("Unreadable frame ({}): {}", e, text.as_str());
                        continue;
                    }
                };
                println!("<- {:?}", event);

                let (replies, done) = bot.react(event);
                for reply in replies {
                    println!("-> {}", reply.name());
                    sink.send(Message::text(reply.to_json()?)).await?;
                }
                if done {
                    break;
                }
            }
            _ = &mut deadline => {
                println!("Time is up, disconnecting");
                break;
            }
        }
    }

    sink.close().await?;
    Ok(())
}
