use serde::{Deserialize, Serialize};
use std::fmt;

pub const DECK_SIZE: usize = 52;
pub const CARDS_PER_PLAYER: usize = 3;
pub const DEFAULT_GAME_MODE: &str = "unset";
pub const UNKNOWN_PLAYER_NAME: &str = "Unknown";

/// Four-digit numeric lobby code, kept as a string on the wire.
pub type LobbyCode = String;

/// Server-assigned identifier of a live connection.
pub type ConnectionId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "♠")]
    Spades,
    #[serde(rename = "♥")]
    Hearts,
    #[serde(rename = "♦")]
    Diamonds,
    #[serde(rename = "♣")]
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Spades => "♠",
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.symbol(), self.suit.symbol())
    }
}

/// Events sent by clients. Framed as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    CreateParty {
        #[serde(default)]
        player_name: Option<String>,
    },
    JoinParty {
        lobby_code: LobbyCode,
        player_name: String,
    },
    CheckLobbyExists {
        lobby_code: LobbyCode,
    },
    KickPlayer {
        lobby_code: LobbyCode,
        player_name: String,
    },
    ChangeGameMode {
        lobby_code: LobbyCode,
        #[serde(default)]
        game_mode: Option<String>,
    },
    LeaveLobby {
        lobby_code: LobbyCode,
        player_name: String,
    },
    DeleteParty {
        lobby_code: LobbyCode,
    },
    StartGame {
        lobby_code: LobbyCode,
    },
    GetPlayerName {
        lobby_code: LobbyCode,
    },
    DistributeCards {
        lobby_code: LobbyCode,
    },
    CardsReceived {
        lobby_code: LobbyCode,
        player_name: String,
    },
    SpinWheel {
        lobby_code: LobbyCode,
    },
    WheelspinReceived {
        player_name: String,
        lobby_code: LobbyCode,
    },
    RequestCurrentState {
        lobby_code: LobbyCode,
    },
    DrawCard {
        lobby_code: LobbyCode,
        player_name: String,
    },
    DiscardCard {
        lobby_code: LobbyCode,
        player_name: String,
        card: Card,
        #[serde(default)]
        animate_reverse: bool,
    },
    ResetDeckScale {
        lobby_code: LobbyCode,
        player_name: String,
    },
    ReverseAnimationComplete {
        lobby_code: LobbyCode,
        player_name: String,
    },
    SkipTurn {
        lobby_code: LobbyCode,
        player_name: String,
    },
    DiscardPileCardSelected {
        lobby_code: LobbyCode,
        card: Card,
    },
    ResetDiscardedCard {
        lobby_code: LobbyCode,
    },
    ReplaceCard {
        lobby_code: LobbyCode,
        player_name: String,
        replaced_card: Card,
        new_card: Card,
        replace_index: usize,
    },
    FlipCardBack {
        lobby_code: LobbyCode,
        player_name: String,
        replace_index: usize,
        was_drawn_from_deck: bool,
    },
}

impl ClientEvent {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Wire name of the event, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::CreateParty { .. } => "create_party",
            ClientEvent::JoinParty { .. } => "join_party",
            ClientEvent::CheckLobbyExists { .. } => "check_lobby_exists",
            ClientEvent::KickPlayer { .. } => "kick_player",
            ClientEvent::ChangeGameMode { .. } => "change_game_mode",
            ClientEvent::LeaveLobby { .. } => "leave_lobby",
            ClientEvent::DeleteParty { .. } => "delete_party",
            ClientEvent::StartGame { .. } => "start_game",
            ClientEvent::GetPlayerName { .. } => "get_player_name",
            ClientEvent::DistributeCards { .. } => "distribute_cards",
            ClientEvent::CardsReceived { .. } => "cards_received",
            ClientEvent::SpinWheel { .. } => "spin_wheel",
            ClientEvent::WheelspinReceived { .. } => "wheelspin_received",
            ClientEvent::RequestCurrentState { .. } => "request_current_state",
            ClientEvent::DrawCard { .. } => "draw_card",
            ClientEvent::DiscardCard { .. } => "discard_card",
            ClientEvent::ResetDeckScale { .. } => "reset_deck_scale",
            ClientEvent::ReverseAnimationComplete { .. } => "reverse_animation_complete",
            ClientEvent::SkipTurn { .. } => "skip_turn",
            ClientEvent::DiscardPileCardSelected { .. } => "discard_pile_card_selected",
            ClientEvent::ResetDiscardedCard { .. } => "reset_discarded_card",
            ClientEvent::ReplaceCard { .. } => "replace_card",
            ClientEvent::FlipCardBack { .. } => "flip_card_back",
        }
    }
}

/// Events sent by the server, to one connection or to a whole lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    PartyCreated {
        lobby_code: LobbyCode,
    },
    LobbyUpdated {
        players: Vec<String>,
        game_mode: String,
    },
    InvalidLobby {
        lobby_code: LobbyCode,
    },
    LobbyValid {
        lobby_code: LobbyCode,
    },
    LobbyJoinSuccess {
        lobby_code: LobbyCode,
    },
    PlayerKicked {
        player_name: String,
    },
    PartyClosed {
        lobby_code: LobbyCode,
    },
    StartGame {
        players: Vec<String>,
    },
    PlayerName {
        player_name: String,
    },
    ReceiveCard {
        card: Card,
        player_name: String,
    },
    UpdateCardCount {
        total_cards_remaining: usize,
    },
    AllCardsSent {
        player_name: String,
    },
    AllCardsDistributed {
        lobby_code: LobbyCode,
    },
    WheelspinResult {
        winner: String,
        players: Vec<String>,
        turn_order: Vec<String>,
    },
    AllAcknowledged {
        winner: String,
    },
    CurrentGameState {
        current_winner: Option<String>,
        players: Vec<String>,
    },
    BroadcastDrawAnimation {
        player_name: String,
    },
    ReceiveDrawnCard {
        card: Card,
        player_name: String,
    },
    CardDiscarded {
        player_name: String,
        card: Card,
    },
    ResetDeckScale {
        player_name: String,
    },
    NextTurn {
        current_player: String,
        next_player: String,
    },
    ShowLogMessage {
        message: String,
    },
    HighlightDiscardedCard {
        card: Card,
    },
    ResetDiscardedCard {},
    UpdateReplacedCard {
        player_name: String,
        replace_index: usize,
        new_card: Card,
    },
    FlipCardBack {
        player_name: String,
        replace_index: usize,
        was_drawn_from_deck: bool,
    },
}

impl ServerEvent {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_card_wire_shape() {
        let card = Card::new(Rank::Ten, Suit::Hearts);
        let value = serde_json::to_value(card).unwrap();
        assert_eq!(value, json!({ "rank": "10", "suit": "♥" }));
        assert_eq!(card.to_string(), "10♥");
    }

    #[test]
    fn test_card_from_client_json() {
        let card: Card = serde_json::from_value(json!({ "rank": "Q", "suit": "♣" })).unwrap();
        assert_eq!(card, Card::new(Rank::Queen, Suit::Clubs));
    }

    #[test]
    fn test_unknown_rank_rejected() {
        let result: Result<Card, _> = serde_json::from_value(json!({ "rank": "1", "suit": "♣" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_client_event_framing() {
        let text = r#"{"event":"join_party","data":{"lobbyCode":"4821","playerName":"Bob"}}"#;
        let event = ClientEvent::from_json(text).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinParty {
                lobby_code: "4821".to_string(),
                player_name: "Bob".to_string(),
            }
        );
        assert_eq!(event.name(), "join_party");
    }

    #[test]
    fn test_create_party_without_name() {
        let event = ClientEvent::from_json(r#"{"event":"create_party","data":{}}"#).unwrap();
        assert_eq!(event, ClientEvent::CreateParty { player_name: None });
    }

    #[test]
    fn test_discard_defaults_animate_reverse() {
        let text = r#"{"event":"discard_card","data":{"lobbyCode":"1000","playerName":"A","card":{"rank":"A","suit":"♠"}}}"#;
        match ClientEvent::from_json(text).unwrap() {
            ClientEvent::DiscardCard {
                animate_reverse,
                card,
                ..
            } => {
                assert!(!animate_reverse);
                assert_eq!(card, Card::new(Rank::Ace, Suit::Spades));
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_server_event_field_names() {
        let event = ServerEvent::NextTurn {
            current_player: "A".to_string(),
            next_player: "B".to_string(),
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "event": "next_turn", "data": { "currentPlayer": "A", "nextPlayer": "B" } })
        );
    }

    #[test]
    fn test_card_count_field_name() {
        let event = ServerEvent::UpdateCardCount {
            total_cards_remaining: 46,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["data"]["totalCardsRemaining"], 46);
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert!(ClientEvent::from_json(r#"{"event":"teleport","data":{}}"#).is_err());
    }
}
