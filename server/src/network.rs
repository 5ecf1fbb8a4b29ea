//! Relay network layer handling WebSocket connections and the routing loop

use crate::config::RelayConfig;
use crate::room::{Delivery, RoomId, RoomRegistry};
use crate::session::ConnectionId;
use futures_util::{Sink, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode, encode, ClientMessage, ServerMessage};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Prefix of request paths that name a room, as in `/rooms/arena`
const ROOM_PATH_PREFIX: &str = "/rooms/";

/// Messages queued per connection before it counts as too slow
pub const OUTBOUND_CAPACITY: usize = 256;

/// Longest a single frame write may take before the connection is dropped
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Events sent from connection tasks to the relay loop
#[derive(Debug)]
pub enum RelayEvent {
    Connected {
        connection_id: ConnectionId,
        room: RoomId,
        sender: mpsc::Sender<ServerMessage>,
    },
    MessageReceived {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
}

/// Relay server owning every room
///
/// Connection tasks only decode and encode frames. All membership changes
/// and routing decisions happen on the task running [`Server::run`], in the
/// order events arrive. Dropping a connection's sender closes it.
pub struct Server {
    listener: Arc<TcpListener>,
    config: RelayConfig,
    rooms: RoomRegistry,
    connections: HashMap<ConnectionId, mpsc::Sender<ServerMessage>>,

    event_tx: mpsc::UnboundedSender<RelayEvent>,
    event_rx: mpsc::UnboundedReceiver<RelayEvent>,
}

impl Server {
    pub async fn new(config: RelayConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = Arc::new(TcpListener::bind(&config.bind_addr).await?);
        info!("Relay listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            rooms: RoomRegistry::new(config.max_members),
            config,
            connections: HashMap::new(),
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns task that accepts connections and starts a task per connection
    fn spawn_acceptor(&self) {
        let listener = Arc::clone(&self.listener);
        let event_tx = self.event_tx.clone();
        let default_room = self.config.default_room.clone();

        tokio::spawn(async move {
            let mut next_connection_id: ConnectionId = 1;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let connection_id = next_connection_id;
                        next_connection_id += 1;

                        let event_tx = event_tx.clone();
                        let default_room = default_room.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(
                                stream,
                                addr,
                                connection_id,
                                default_room,
                                event_tx,
                            )
                            .await
                            {
                                warn!("Connection {} from {} failed: {}", connection_id, addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn handle_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connected {
                connection_id,
                room,
                sender,
            } => {
                self.connections.insert(connection_id, sender);
                match self.rooms.join(connection_id, room.clone()) {
                    Some(deliveries) => self.dispatch(deliveries),
                    None => {
                        warn!("Room {} is full, refusing connection {}", room, connection_id);
                        self.dispatch(vec![Delivery::Close { to: connection_id }]);
                    }
                }
            }
            RelayEvent::MessageReceived {
                connection_id,
                message,
            } => {
                let deliveries = self.rooms.route(connection_id, message);
                self.dispatch(deliveries);
            }
            RelayEvent::Disconnected { connection_id } => {
                self.connections.remove(&connection_id);
                let deliveries = self.rooms.leave(connection_id);
                self.dispatch(deliveries);
            }
        }
    }

    fn dispatch(&mut self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            match delivery {
                Delivery::Send { to, message } => {
                    let Some(sender) = self.connections.get(&to) else {
                        continue;
                    };
                    match sender.try_send(message) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            warn!("Connection {} is not keeping up, disconnecting", to);
                            self.connections.remove(&to);
                        }
                        Err(TrySendError::Closed(_)) => {
                            debug!("Writer for connection {} is gone", to);
                        }
                    }
                }
                Delivery::Close { to } => {
                    // queued messages are still flushed by the writer
                    self.connections.remove(&to);
                }
            }
        }
    }

    /// Main relay loop applying connection events in arrival order
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_acceptor();

        info!("Relay started successfully");

        while let Some(event) = self.event_rx.recv().await {
            self.handle_event(event);
        }

        Ok(())
    }
}

/// Maps a request path onto a room, falling back to the default room
pub fn room_from_path(path: &str, default_room: &RoomId) -> RoomId {
    match path.strip_prefix(ROOM_PATH_PREFIX) {
        Some(name) if !name.is_empty() && !name.contains('/') => RoomId::new(name),
        _ => default_room.clone(),
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connection_id: ConnectionId,
    default_room: RoomId,
    event_tx: mpsc::UnboundedSender<RelayEvent>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut path = String::new();
    let capture_path = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        path = request.uri().path().to_string();
        Ok(response)
    };
    let websocket = tokio_tungstenite::accept_hdr_async(stream, capture_path).await?;

    let room = room_from_path(&path, &default_room);
    info!("Connection {} from {} requested room {}", connection_id, addr, room);

    let (sink, mut frames) = websocket.split();
    let (out_tx, out_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CAPACITY);
    let (closed_tx, mut closed_rx) = oneshot::channel();

    event_tx.send(RelayEvent::Connected {
        connection_id,
        room,
        sender: out_tx,
    })?;

    tokio::spawn(write_frames(sink, out_rx, connection_id, closed_tx));

    loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok(Message::Binary(data))) => match decode::<ClientMessage>(&data) {
                    Ok(message) => {
                        event_tx.send(RelayEvent::MessageReceived {
                            connection_id,
                            message,
                        })?;
                    }
                    Err(e) => warn!("Connection {}: {}", connection_id, e),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Connection {} read error: {}", connection_id, e);
                    break;
                }
            },
            _ = &mut closed_rx => {
                debug!("Dropping connection {}", connection_id);
                break;
            }
        }
    }

    event_tx.send(RelayEvent::Disconnected { connection_id })?;
    Ok(())
}

/// Writes queued messages until the relay drops the sender, then sends a
/// Close frame and tells the reader to stop. The socket is released once
/// both halves are gone, whether or not the peer answers the close.
async fn write_frames<S>(
    mut sink: S,
    mut out_rx: mpsc::Receiver<ServerMessage>,
    connection_id: ConnectionId,
    closed_tx: oneshot::Sender<()>,
) where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(message) = out_rx.recv().await {
        let data = match encode(&message) {
            Ok(data) => data,
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };
        match timeout(WRITE_TIMEOUT, sink.send(Message::Binary(data))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Send to connection {} failed: {}", connection_id, e);
                break;
            }
            Err(_) => {
                warn!("Send to connection {} timed out", connection_id);
                break;
            }
        }
    }

    debug!("Closing connection {}", connection_id);
    let _ = timeout(WRITE_TIMEOUT, sink.send(Message::Close(None))).await;
    drop(sink);
    let _ = closed_tx.send(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    #[test]
    fn test_room_from_path() {
        let default_room = RoomId::from("room1");

        assert_eq!(room_from_path("/", &default_room), default_room);
        assert_eq!(room_from_path("", &default_room), default_room);
        assert_eq!(room_from_path("/rooms/", &default_room), default_room);
        assert_eq!(room_from_path("/rooms/a/b", &default_room), default_room);
        assert_eq!(
            room_from_path("/rooms/arena", &default_room),
            RoomId::from("arena")
        );
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<RelayEvent>();

        assert!(tx
            .send(RelayEvent::MessageReceived {
                connection_id: 3,
                message: ClientMessage::RemovePlayer("victim".to_string()),
            })
            .is_ok());

        match rx.try_recv().unwrap() {
            RelayEvent::MessageReceived {
                connection_id,
                message,
            } => {
                assert_eq!(connection_id, 3);
                assert_eq!(message, ClientMessage::RemovePlayer("victim".to_string()));
            }
            _ => panic!("Unexpected event type"),
        }
    }

    async fn test_server(max_members: usize) -> Server {
        let config = RelayConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            max_members,
            ..RelayConfig::default()
        };
        tokio_test::assert_ok!(Server::new(config).await)
    }

    fn connect(
        server: &mut Server,
        connection_id: ConnectionId,
        capacity: usize,
    ) -> mpsc::Receiver<ServerMessage> {
        let (sender, receiver) = mpsc::channel(capacity);
        server.handle_event(RelayEvent::Connected {
            connection_id,
            room: RoomId::from("room1"),
            sender,
        });
        receiver
    }

    fn drain(receiver: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut received = Vec::new();
        while let Ok(message) = receiver.try_recv() {
            received.push(message);
        }
        received
    }

    #[tokio::test]
    async fn test_refused_connection_is_closed() {
        let mut server = test_server(1).await;

        let mut first_rx = connect(&mut server, 1, OUTBOUND_CAPACITY);
        assert_eq!(first_rx.try_recv().unwrap(), ServerMessage::HostConfirm);

        let mut second_rx = connect(&mut server, 2, OUTBOUND_CAPACITY);
        assert_eq!(second_rx.try_recv(), Err(TryRecvError::Disconnected));
        assert!(!server.connections.contains_key(&2));
    }

    #[tokio::test]
    async fn test_host_disconnect_closes_members() {
        let mut server = test_server(32).await;

        let _host_rx = connect(&mut server, 1, OUTBOUND_CAPACITY);
        let mut member_rx = connect(&mut server, 2, OUTBOUND_CAPACITY);
        server.handle_event(RelayEvent::Disconnected { connection_id: 1 });

        let received = drain(&mut member_rx);
        assert!(matches!(received[0], ServerMessage::Joined(_)));
        assert!(matches!(received[1], ServerMessage::Left(_)));
        assert_eq!(received[2], ServerMessage::HostLeft);
        assert_eq!(received.len(), 3);

        // sender dropped, so the writer sends a Close frame and stops
        assert_eq!(member_rx.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[tokio::test]
    async fn test_slow_connection_is_dropped_when_queue_fills() {
        let mut server = test_server(32).await;

        let _host_rx = connect(&mut server, 1, OUTBOUND_CAPACITY);
        // room for Joined plus one update
        let mut member_rx = connect(&mut server, 2, 2);

        let record = shared::Character::new("h");
        let updates = (0..50)
            .map(|_| Delivery::Send {
                to: 2,
                message: ServerMessage::UpdatedMovement(record.clone()),
            })
            .collect();
        server.dispatch(updates);

        assert!(!server.connections.contains_key(&2));
        assert!(server.connections.contains_key(&1));

        let received = drain(&mut member_rx);
        assert_eq!(received.len(), 2);
        assert!(matches!(received[0], ServerMessage::Joined(_)));
        assert_eq!(member_rx.try_recv(), Err(TryRecvError::Disconnected));
    }
}
