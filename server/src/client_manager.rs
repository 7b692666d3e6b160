//! Live connection tracking for the lobby server
//!
//! This module handles the server-side bookkeeping of WebSocket connections:
//! - Connection id assignment and capacity enforcement
//! - The outbound queue of each connection, drained by its writer task
//! - Peer addresses for connection logs
//!
//! Which lobby a connection is seated in is not tracked here; that lives in
//! the lobby rosters owned by the gateway.

use log::{info, warn};
use shared::ConnectionId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;

/// A connected client and the queue its writer task drains
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier assigned by the server
    pub id: ConnectionId,
    /// Peer address of the WebSocket connection
    pub addr: SocketAddr,
    /// When the handshake completed
    pub connected_at: Instant,
    /// Number of frames queued to this client so far
    pub frames_sent: u64,
    sender: mpsc::UnboundedSender<String>,
}

impl Client {
    pub fn new(id: ConnectionId, addr: SocketAddr, sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            frames_sent: 0,
            sender,
        }
    }

    /// Queues an encoded frame. Returns false once the writer task is gone.
    pub fn send(&mut self, frame: String) -> bool {
        if self.sender.send(frame).is_ok() {
            self.frames_sent += 1;
            true
        } else {
            false
        }
    }
}

/// Manages all live connections
///
/// Connection ids start at 1 and are never reused within a process, so a
/// stale id held by a lobby roster can never address a newer connection.
pub struct ClientManager {
    /// Connected clients indexed by their id
    clients: HashMap<ConnectionId, Client>,
    /// Next available connection id
    next_client_id: ConnectionId,
    /// Maximum number of concurrent connections allowed
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new connection.
    ///
    /// Returns Some(id) if successful, None if the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, sender: mpsc::UnboundedSender<String>) -> Option<ConnectionId> {
        if self.clients.len() >= self.max_clients {
            warn!("Refusing connection from {}: server full", addr);
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr, sender));

        Some(client_id)
    }

    /// Removes a connection. Returns true if it was known.
    pub fn remove_client(&mut self, client_id: &ConnectionId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Client {} ({}) disconnected after {:?} ({} frames sent)",
                client.id,
                client.addr,
                client.connected_at.elapsed(),
                client.frames_sent
            );
            true
        } else {
            false
        }
    }

    /// Queues a frame for one connection.
    ///
    /// Frames for ids that are no longer connected are dropped; the
    /// disconnect is being processed separately.
    pub fn send_to(&mut self, client_id: ConnectionId, frame: &str) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => client.send(frame.to_string()),
            None => false,
        }
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
