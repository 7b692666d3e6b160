//! Server network layer: WebSocket connections and the lobby event loop

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::dispatch::{Dispatch, TimerEvent};
use crate::error::ServerError;
use crate::gateway::Gateway;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientEvent, ConnectionId, ServerEvent};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_tungstenite::tungstenite::Message;

/// Messages sent from connection and timer tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<String>,
        reply: oneshot::Sender<Option<ConnectionId>>,
    },
    EventReceived {
        client_id: ConnectionId,
        event: ClientEvent,
    },
    Disconnected {
        client_id: ConnectionId,
    },
    TimerFired {
        timer: TimerEvent,
    },
    Shutdown,
}

/// Stops a running [`Server`] from another task.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

/// Main server owning every lobby and connection
///
/// All lobby state is touched only from [`Server::run`], one message at a
/// time. Connection tasks and timers talk to it exclusively through
/// [`ServerMessage`]s.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    clients: ClientManager,
    gateway: Gateway,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        Self::bind_with_gateway(&config, Gateway::new(config.timings)).await
    }

    /// Binds with a prepared gateway, e.g. one with a fixed seed.
    pub async fn bind_with_gateway(config: &ServerConfig, gateway: Gateway) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on ws://{}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: ClientManager::new(config.max_clients),
            gateway,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that accepts TCP connections and upgrades them
    fn spawn_acceptor(listener: TcpListener, server_tx: mpsc::UnboundedSender<ServerMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let server_tx = server_tx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, server_tx).await {
                                warn!("Connection from {} ended with error: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
    }

    /// Arms a timer that feeds `timer` back into the main loop after `delay`
    fn spawn_timer(&self, delay: Duration, timer: TimerEvent) {
        let server_tx = self.server_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if server_tx.send(ServerMessage::TimerFired { timer }).is_err() {
                debug!("Timer fired after server shutdown");
            }
        });
    }

    /// Fans out outbound events and arms the requested timers
    fn deliver(&mut self, dispatch: Dispatch) {
        for outbound in dispatch.outbound {
            let frame = match encode(&outbound.event) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Dropping {:?}: {}", outbound.event, e);
                    continue;
                }
            };

            for client_id in outbound.recipients {
                if !self.clients.send_to(client_id, &frame) {
                    debug!("Dropped frame for closed connection {}", client_id);
                }
            }
        }

        for scheduled in dispatch.timers {
            self.spawn_timer(scheduled.delay, scheduled.timer);
        }
    }

    /// Main server loop processing one message at a time
    pub async fn run(mut self) -> Result<(), ServerError> {
        let acceptor = self
            .listener
            .take()
            .map(|listener| Self::spawn_acceptor(listener, self.server_tx.clone()));

        let mut stats_interval = interval(Duration::from_secs(60));
        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::Connected { addr, sender, reply }) => {
                            let client_id = self.clients.add_client(addr, sender);
                            if reply.send(client_id).is_err() {
                                debug!("Connection from {} gone before registration", addr);
                            }
                        }
                        Some(ServerMessage::EventReceived { client_id, event }) => {
                            debug!("Client {} sent {}", client_id, event.name());
                            let dispatch = self.gateway.handle(client_id, event);
                            self.deliver(dispatch);
                        }
                        Some(ServerMessage::Disconnected { client_id }) => {
                            self.clients.remove_client(&client_id);
                            let dispatch = self.gateway.disconnect(client_id);
                            self.deliver(dispatch);
                        }
                        Some(ServerMessage::TimerFired { timer }) => {
                            let dispatch = self.gateway.fire(timer);
                            self.deliver(dispatch);
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = stats_interval.tick() => {
                    if !self.clients.is_empty() {
                        debug!(
                            "{} clients connected, {} lobbies active",
                            self.clients.len(),
                            self.gateway.directory().len()
                        );
                    }
                },
            }
        }

        // Releases the listening socket
        if let Some(acceptor) = acceptor {
            acceptor.abort();
        }
        Ok(())
    }
}

fn encode(event: &ServerEvent) -> Result<String, ServerError> {
    Ok(event.to_json()?)
}

/// Drives one WebSocket connection until it closes
///
/// Inbound text frames are decoded and forwarded to the main loop; frames
/// queued by the main loop are written by a separate writer task.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) -> Result<(), ServerError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut source) = ws.split();

    let (sender, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let (reply, registered) = oneshot::channel();
    if server_tx
        .send(ServerMessage::Connected {
            addr,
            sender,
            reply,
        })
        .is_err()
    {
        return Ok(());
    }

    let Some(client_id) = registered.await.ok().flatten() else {
        sink.send(Message::Close(None)).await?;
        return Ok(());
    };

    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = sink.send(Message::text(frame)).await {
                debug!("Write to client {} failed: {}", client_id, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(message) = source.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientEvent::from_json(text.as_str()) {
                Ok(event) => {
                    if server_tx
                        .send(ServerMessage::EventReceived { client_id, event })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => warn!("Failed to decode event from client {}: {}", client_id, e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Error reading from client {}: {}", client_id, e);
                break;
            }
        }
    }

    let _ = server_tx.send(ServerMessage::Disconnected { client_id });
    Ok(())
}
