//! WebSocket relay server and connection handling.

use crate::config::ServerConfig;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::{generate_code, GameRoom, JoinError, RoomError, RoomPlayer};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    pub config: ServerConfig,
    /// All active rooms, by code
    pub rooms: DashMap<String, GameRoom>,
    /// Mapping from player ID to their room code
    pub player_rooms: DashMap<Uuid, String>,
    /// Mapping from player ID to their message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Broadcast a message to every connected member of a room except one.
    ///
    /// Must not be called while holding a guard on the same room.
    pub fn broadcast_to_room_except(&self, room_id: &str, except: Option<Uuid>, msg: ServerMessage) {
        let recipients = match self.rooms.get(room_id) {
            Some(room) => room.connected_ids(except),
            None => return,
        };
        for player_id in recipients {
            self.send_to_player(player_id, msg.clone());
        }
    }

    /// Broadcast a message to every connected member of a room.
    pub fn broadcast_to_room(&self, room_id: &str, msg: ServerMessage) {
        self.broadcast_to_room_except(room_id, None, msg);
    }

    fn broadcast_room_update(&self, room_id: &str) {
        let info = match self.rooms.get(room_id) {
            Some(room) => room.to_info(),
            None => return,
        };
        self.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: info });
    }

    fn unused_room_code(&self) -> String {
        loop {
            let code = generate_code();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

/// Bind the configured address and run the WebSocket server.
pub async fn run_server(state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(state.config.addr).await?;
    info!("Gatan relay listening on {}", listener.local_addr()?);
    serve(listener, state).await
}

/// Accept connections on an already bound listener.
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) -> anyhow::Result<()> {
    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// One WebSocket connection. The player id changes if the client reconnects
/// into an earlier seat.
struct Connection {
    player_id: Uuid,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut conn = Connection {
        player_id: Uuid::new_v4(),
        tx: tx.clone(),
    };
    state.player_senders.insert(conn.player_id, tx);
    state.send_to_player(
        conn.player_id,
        ServerMessage::Welcome {
            player_id: conn.player_id,
        },
    );

    // Forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(&mut conn, client_msg, &state),
                Err(e) => warn!("Invalid message from {}: {}", conn.player_id, e),
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", conn.player_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", conn.player_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect, unless a newer connection took the seat over
    let owns_seat = state
        .player_senders
        .get(&conn.player_id)
        .is_some_and(|tx| tx.same_channel(&conn.tx));
    if owns_seat {
        handle_disconnect(conn.player_id, &state);
        state.player_senders.remove(&conn.player_id);
    }
    send_task.abort();

    info!("Connection closed for {}", conn.player_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(conn: &mut Connection, msg: ClientMessage, state: &Arc<ServerState>) {
    let player_id = conn.player_id;
    match msg {
        ClientMessage::CreateRoom {
            player_name,
            player_color,
        } => {
            leave_room(player_id, state);

            let room_id = state.unused_room_code();
            let host = RoomPlayer::new(player_id, player_name, player_color);
            let room = GameRoom::new(room_id.clone(), host, state.config.max_players);
            let info = room.to_info();

            state.rooms.insert(room_id.clone(), room);
            state.player_rooms.insert(player_id, room_id.clone());
            info!(room = %room_id, player = %player_id, "room created");

            state.send_to_player(player_id, ServerMessage::RoomCreated { room: info, player_id });
        }

        ClientMessage::JoinRoom {
            room_id,
            player_name,
            player_color,
        } => {
            let room_id = room_id.to_uppercase();
            let joined = match state.rooms.get_mut(&room_id) {
                Some(mut room) => room
                    .join(RoomPlayer::new(player_id, player_name, player_color))
                    .map(|()| room.to_info()),
                None => Err(JoinError::NotFound),
            };

            match joined {
                Ok(info) => {
                    state.player_rooms.insert(player_id, room_id.clone());
                    info!(room = %room_id, player = %player_id, "player joined");
                    state.send_to_player(
                        player_id,
                        ServerMessage::JoinedRoom {
                            room: info.clone(),
                            player_id,
                        },
                    );
                    state.broadcast_to_room_except(
                        &room_id,
                        Some(player_id),
                        ServerMessage::RoomUpdated { room: info },
                    );
                }
                Err(e) => {
                    debug!(room = %room_id, reason = %e, "join refused");
                    state.send_to_player(
                        player_id,
                        ServerMessage::JoinFailed {
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }

        ClientMessage::SetReady { ready } => {
            let result = with_room(player_id, state, |room| room.set_ready(player_id, ready));
            match result {
                Ok((room_id, ())) => state.broadcast_room_update(&room_id),
                Err(e) => send_error(state, player_id, e),
            }
        }

        ClientMessage::StartGame => {
            let seed: u64 = rand::random();
            let result = with_room(player_id, state, |room| room.start(player_id, seed));
            match result {
                Ok((room_id, players)) => {
                    info!(room = %room_id, seed, players = players.len(), "game started");
                    state.broadcast_to_room(
                        &room_id,
                        ServerMessage::GameStarted {
                            room_id: room_id.clone(),
                            seed,
                            players,
                        },
                    );
                }
                Err(e) => send_error(state, player_id, e),
            }
        }

        ClientMessage::GameAction { action } => {
            let result = with_room(player_id, state, |room| room.record_action(player_id, action));
            match result {
                Ok((room_id, relayed)) => {
                    debug!(room = %room_id, player = %player_id, kind = %relayed.kind, "relaying action");
                    state.broadcast_to_room_except(
                        &room_id,
                        Some(player_id),
                        ServerMessage::GameActionReceived { action: relayed },
                    );
                }
                Err(e) => send_error(state, player_id, e),
            }
        }

        ClientMessage::Reconnect {
            room_id,
            player_id: seat,
        } => reconnect(conn, room_id.to_uppercase(), seat, state),

        ClientMessage::StateChecksum {
            checksum,
            action_count,
        } => {
            if let Some(room_id) = state.player_rooms.get(&player_id).map(|r| r.value().clone()) {
                state.broadcast_to_room_except(
                    &room_id,
                    Some(player_id),
                    ServerMessage::StateChecksum {
                        player_id,
                        checksum,
                        action_count,
                    },
                );
            }
        }

        ClientMessage::LeaveRoom => {
            if leave_room(player_id, state) {
                state.send_to_player(player_id, ServerMessage::LeftRoom);
            }
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

/// Run `f` on the sender's room. Returns the room code alongside the result.
fn with_room<T>(
    player_id: Uuid,
    state: &ServerState,
    f: impl FnOnce(&mut GameRoom) -> Result<T, RoomError>,
) -> Result<(String, T), RoomError> {
    let room_id = state
        .player_rooms
        .get(&player_id)
        .map(|r| r.value().clone())
        .ok_or(RoomError::NotFound)?;
    let mut room = state.rooms.get_mut(&room_id).ok_or(RoomError::NotFound)?;
    let value = f(&mut *room)?;
    Ok((room_id, value))
}

fn send_error(state: &ServerState, player_id: Uuid, error: RoomError) {
    state.send_to_player(
        player_id,
        ServerMessage::Error {
            message: error.to_string(),
        },
    );
}

/// Put a returning client back into its seat and replay the room's log.
fn reconnect(conn: &mut Connection, room_id: String, seat: Uuid, state: &Arc<ServerState>) {
    let restored = match state.rooms.get_mut(&room_id) {
        Some(mut room) => room.reconnect(seat).map(|()| {
            let started = room.seed.map(|seed| (seed, room.player_configs()));
            (room.to_info(), started, room.actions.clone())
        }),
        None => Err(RoomError::NotFound),
    };

    let (info, started, actions) = match restored {
        Ok(restored) => restored,
        Err(e) => {
            state.send_to_player(
                conn.player_id,
                ServerMessage::JoinFailed {
                    reason: e.to_string(),
                },
            );
            return;
        }
    };

    if conn.player_id != seat {
        leave_room(conn.player_id, state);
        state.player_senders.remove(&conn.player_id);
        conn.player_id = seat;
        state.player_senders.insert(seat, conn.tx.clone());
    }
    state.player_rooms.insert(seat, room_id.clone());
    info!(room = %room_id, player = %seat, actions = actions.len(), "player reconnected");

    state.send_to_player(
        seat,
        ServerMessage::JoinedRoom {
            room: info,
            player_id: seat,
        },
    );
    if let Some((seed, players)) = started {
        state.send_to_player(
            seat,
            ServerMessage::GameStarted {
                room_id: room_id.clone(),
                seed,
                players,
            },
        );
    }
    if !actions.is_empty() {
        state.send_to_player(seat, ServerMessage::SyncActions { actions });
    }

    state.broadcast_to_room_except(
        &room_id,
        Some(seat),
        ServerMessage::PlayerReconnected { player_id: seat },
    );
    state.broadcast_room_update(&room_id);
}

/// Remove a player from their room, if any. Returns whether they had one.
fn leave_room(player_id: Uuid, state: &ServerState) -> bool {
    let Some((_, room_id)) = state.player_rooms.remove(&player_id) else {
        return false;
    };

    let outcome = state.rooms.get_mut(&room_id).map(|mut room| {
        let new_host = room.remove_player(player_id).ok().flatten();
        (room.is_empty(), new_host)
    });

    match outcome {
        Some((true, _)) => {
            state.rooms.remove(&room_id);
            info!(room = %room_id, "room removed");
        }
        Some((false, new_host)) => {
            if let Some(host_id) = new_host {
                state.broadcast_to_room(&room_id, ServerMessage::HostChanged { host_id });
            }
            state.broadcast_room_update(&room_id);
        }
        None => {}
    }
    true
}

/// Handle player disconnect.
fn handle_disconnect(player_id: Uuid, state: &Arc<ServerState>) {
    let Some(room_id) = state.player_rooms.get(&player_id).map(|r| r.value().clone()) else {
        return;
    };

    let started = state.rooms.get(&room_id).is_some_and(|room| room.started);
    if !started {
        // Lobby seats are simply given up
        leave_room(player_id, state);
        return;
    }

    state.player_rooms.remove(&player_id);
    let outcome = state
        .rooms
        .get_mut(&room_id)
        .and_then(|mut room| room.disconnect(player_id));
    let Some(outcome) = outcome else {
        return;
    };

    info!(room = %room_id, player = %player_id, "player disconnected");
    state.broadcast_to_room(&room_id, ServerMessage::PlayerDisconnected { player_id });
    if let Some(host_id) = outcome.new_host {
        state.broadcast_to_room(&room_id, ServerMessage::HostChanged { host_id });
    }
    state.broadcast_room_update(&room_id);

    let state = Arc::clone(state);
    let grace = state.config.disconnect_grace;
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        expire_player(&state, &room_id, player_id, outcome.generation);
    });
}

/// Drop a seat whose grace period ran out, and the room with it if empty.
fn expire_player(state: &ServerState, room_id: &str, player_id: Uuid, generation: u64) {
    let outcome = state
        .rooms
        .get_mut(room_id)
        .map(|mut room| (room.expire(player_id, generation), room.is_empty()));

    match outcome {
        Some((true, true)) => {
            state.rooms.remove(room_id);
            info!(room = %room_id, "removing inactive room");
        }
        Some((true, false)) => {
            info!(room = %room_id, player = %player_id, "seat expired");
            state.broadcast_room_update(room_id);
        }
        _ => {}
    }
}
