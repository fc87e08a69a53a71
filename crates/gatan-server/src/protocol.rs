//! WebSocket protocol messages for Gatan multiplayer.

use gatan_core::{ActionEnvelope, PlayerConfig};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new game room
    CreateRoom {
        player_name: String,
        player_color: String,
    },

    /// Join an existing room by code
    JoinRoom {
        room_id: String,
        player_name: String,
        player_color: String,
    },

    /// Toggle ready status in the lobby
    SetReady { ready: bool },

    /// Start the game (host only)
    StartGame,

    /// Relay a game action to the rest of the room
    GameAction { action: ActionEnvelope },

    /// Take a seat back after a dropped connection
    Reconnect { room_id: String, player_id: Uuid },

    /// Share a state checksum for divergence detection
    StateChecksum { checksum: u64, action_count: usize },

    /// Leave current room
    LeaveRoom,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with the id this connection plays under
    Welcome { player_id: Uuid },

    /// Room created, the creator is seated as host
    RoomCreated { room: RoomInfo, player_id: Uuid },

    /// Joined room successfully
    JoinedRoom { room: RoomInfo, player_id: Uuid },

    /// Join or reconnect was refused
    JoinFailed { reason: String },

    /// Left room successfully
    LeftRoom,

    /// Room membership or readiness changed
    RoomUpdated { room: RoomInfo },

    /// Every seat should start its engine from these arguments
    GameStarted {
        room_id: String,
        seed: u64,
        players: Vec<PlayerConfig>,
    },

    /// An action relayed from another member
    GameActionReceived { action: ActionEnvelope },

    /// The room's full action log, sent on reconnect
    SyncActions { actions: Vec<ActionEnvelope> },

    PlayerDisconnected { player_id: Uuid },

    PlayerReconnected { player_id: Uuid },

    HostChanged { host_id: Uuid },

    /// Another member's checksum after `action_count` actions
    StateChecksum {
        player_id: Uuid,
        checksum: u64,
        action_count: usize,
    },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

/// Room information for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: String,
    pub players: Vec<PlayerInfo>,
    pub max_players: usize,
    pub host_id: Uuid,
    pub started: bool,
}

/// Player information in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub ready: bool,
    pub connected: bool,
}
