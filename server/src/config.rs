//! Runtime configuration for the lobby server

use std::time::Duration;

/// Delays of the timed yield points in distribution and drawing.
///
/// These only pace server events to line up with client animations; no
/// ordering guarantee depends on their exact values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Pause between two cards dealt to the same player
    pub card_interval: Duration,
    /// Pause between an accepted acknowledgment and dealing to the next player
    pub player_interval: Duration,
    /// Time from the draw animation broadcast until the card is revealed
    pub draw_reveal: Duration,
    /// Time from the reveal until the lobby accepts another draw
    pub draw_unlock: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            card_interval: Duration::from_millis(300),
            player_interval: Duration::from_millis(500),
            draw_reveal: Duration::from_millis(1000),
            draw_unlock: Duration::from_millis(500),
        }
    }
}

impl Timings {
    pub fn from_millis(card_interval: u64, player_interval: u64, draw_reveal: u64, draw_unlock: u64) -> Self {
        Self {
            card_interval: Duration::from_millis(card_interval),
            player_interval: Duration::from_millis(player_interval),
            draw_reveal: Duration::from_millis(draw_reveal),
            draw_unlock: Duration::from_millis(draw_unlock),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    pub addr: String,
    /// Maximum number of live connections
    pub max_clients: usize,
    pub timings: Timings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
            max_clients: 256,
            timings: Timings::default(),
        }
    }
}
