//! # Card Lobby Server Library
//!
//! This library provides the authoritative server for a multiplayer card game
//! played in small private lobbies. Clients connect over WebSocket, exchange
//! JSON events, and the server keeps every lobby's shared state consistent:
//! who is seated, whose turn it is, and what is left in the deck.
//!
//! ## Core Responsibilities
//!
//! ### Lobby Directory
//! Lobbies are addressed by a random four-digit code. The directory hands out
//! codes, tracks which connection is seated where, and removes lobbies when
//! their last player leaves or the host closes the party.
//!
//! ### Turn Order
//! A host-triggered spin picks a starting player uniformly at random and
//! rotates the roster into the turn order. Play waits until every seated
//! player has acknowledged the result.
//!
//! ### Card Distribution
//! Dealing is paced: players receive their cards one at a time on a timer,
//! and the next player is dealt only after the current one confirms receipt.
//!
//! ### Turn Actions
//! Draws, discards, replacements and skips mutate the shared deck and discard
//! pile and advance the turn cursor. A draw locks the lobby until the drawn
//! card has been revealed to its owner.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! All lobby state is owned by one task ([`network::Server::run`]) and every
//! inbound event, disconnect and timer is processed there in arrival order.
//! Connection tasks only decode frames and write queued frames back out.
//!
//! ### Timers as Events
//! Game logic never sleeps. Handlers return a [`dispatch::Dispatch`] that lists
//! the events to send and the timers to arm; a fired timer re-enters the loop
//! like any other event and is ignored if its lobby has since gone away.
//!
//! ### Silent Rejection
//! Malformed or out-of-protocol requests are logged and dropped; the offending
//! client gets no reply. See [`policy`].
//!
//! ## Module Organization
//!
//! - `client_manager`: connection ids, capacity and outbound queues
//! - `config`: listener address and the pacing delays
//! - `deck`: the 52-card deck and its shuffle
//! - `directory`: lobby codes and lookup
//! - `dispatch`: outbound events and timers produced by handlers
//! - `distribution`: paced, acknowledged dealing
//! - `error`: fatal server errors
//! - `gateway`: routes client events and timers to the game modules
//! - `lobby`: roster and per-lobby game state
//! - `network`: WebSocket listener and the main loop
//! - `policy`: rejection reasons and how they are handled
//! - `turn`: draw, discard, replace, skip
//! - `turn_order`: spin and the acknowledgement barrier
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bind to 127.0.0.1:3000 with the default pacing delays
//!     let server = Server::bind(ServerConfig::default()).await?;
//!
//!     // Runs until a shutdown is requested through `server.handle()`
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod deck;
pub mod directory;
pub mod dispatch;
pub mod distribution;
pub mod error;
pub mod gateway;
pub mod lobby;
pub mod network;
pub mod policy;
pub mod turn;
pub mod turn_order;
