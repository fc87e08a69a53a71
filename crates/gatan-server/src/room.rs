//! Game room management.
//!
//! The server never runs the engine. A room only tracks who is seated, who is
//! ready and connected, and the ordered log of relayed actions.

use gatan_core::{ActionEnvelope, PlayerConfig, PlayerId};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{PlayerInfo, RoomInfo};

/// Length of a room code
pub const ROOM_CODE_LEN: usize = 6;

/// Reasons a join is refused, worded for display
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("Room not found")]
    NotFound,

    #[error("Room is full")]
    Full,

    #[error("Game already started")]
    AlreadyStarted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("Room not found")]
    NotFound,

    #[error("Player not found")]
    PlayerNotFound,

    #[error("Only the host can start the game")]
    NotHost,

    #[error("Not all players are ready")]
    NotAllReady,

    #[error("Not enough players")]
    NotEnoughPlayers,

    #[error("Game already started")]
    AlreadyStarted,

    #[error("Game not started")]
    NotStarted,
}

/// Fresh 6-character uppercase room code
pub fn generate_code() -> String {
    Uuid::new_v4().simple().to_string()[..ROOM_CODE_LEN].to_uppercase()
}

/// Engine id for a seated player
pub fn engine_id(player_id: Uuid) -> PlayerId {
    PlayerId::new(player_id.to_string())
}

/// A player seated in a room.
#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub ready: bool,
    pub connected: bool,
    /// Bumped on every disconnect so a stale grace timer can tell it lost
    pub disconnects: u64,
}

impl RoomPlayer {
    pub fn new(id: Uuid, name: String, color: String) -> Self {
        Self {
            id,
            name,
            color,
            ready: false,
            connected: true,
            disconnects: 0,
        }
    }

    pub fn to_info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            color: self.color.clone(),
            ready: self.ready,
            connected: self.connected,
        }
    }
}

/// What a disconnect changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnected {
    /// Pass back to [`GameRoom::expire`] once the grace period ends
    pub generation: u64,
    pub new_host: Option<Uuid>,
}

/// A game room that can hold multiple players.
#[derive(Debug, Clone)]
pub struct GameRoom {
    pub id: String,
    pub max_players: usize,
    pub host_id: Uuid,
    pub started: bool,
    /// Seed shared by every seat once the game starts
    pub seed: Option<u64>,
    /// Seat order
    pub players: Vec<RoomPlayer>,
    /// Every relayed action, in relay order
    pub actions: Vec<ActionEnvelope>,
}

impl GameRoom {
    pub fn new(id: String, host: RoomPlayer, max_players: usize) -> Self {
        Self {
            id,
            max_players: max_players.clamp(2, 4),
            host_id: host.id,
            started: false,
            seed: None,
            players: vec![host],
            actions: Vec::new(),
        }
    }

    pub fn player(&self, id: Uuid) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: Uuid) -> Result<&mut RoomPlayer, RoomError> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RoomError::PlayerNotFound)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Ids of connected members, optionally leaving one out
    pub fn connected_ids(&self, except: Option<Uuid>) -> Vec<Uuid> {
        self.players
            .iter()
            .filter(|p| p.connected && Some(p.id) != except)
            .map(|p| p.id)
            .collect()
    }

    pub fn join(&mut self, player: RoomPlayer) -> Result<(), JoinError> {
        if self.started {
            return Err(JoinError::AlreadyStarted);
        }
        if self.is_full() {
            return Err(JoinError::Full);
        }
        self.players.push(player);
        Ok(())
    }

    pub fn set_ready(&mut self, id: Uuid, ready: bool) -> Result<(), RoomError> {
        self.player_mut(id)?.ready = ready;
        Ok(())
    }

    /// Start the game. Returns the engine configs in seat order.
    pub fn start(&mut self, requester: Uuid, seed: u64) -> Result<Vec<PlayerConfig>, RoomError> {
        if requester != self.host_id {
            return Err(RoomError::NotHost);
        }
        if self.started {
            return Err(RoomError::AlreadyStarted);
        }
        if self.players.len() < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }
        if !self.players.iter().all(|p| p.ready) {
            return Err(RoomError::NotAllReady);
        }

        self.started = true;
        self.seed = Some(seed);
        Ok(self.player_configs())
    }

    pub fn player_configs(&self) -> Vec<PlayerConfig> {
        self.players
            .iter()
            .map(|p| PlayerConfig::with_id(engine_id(p.id), p.name.clone(), p.color.clone()))
            .collect()
    }

    /// Stamp and log an action for relay.
    pub fn record_action(
        &mut self,
        from: Uuid,
        mut envelope: ActionEnvelope,
    ) -> Result<ActionEnvelope, RoomError> {
        if !self.started {
            return Err(RoomError::NotStarted);
        }
        if self.player(from).is_none() {
            return Err(RoomError::PlayerNotFound);
        }

        envelope.timestamp = now_millis();
        envelope.actor = Some(engine_id(from));
        self.actions.push(envelope.clone());
        Ok(envelope)
    }

    /// Mark a player disconnected and hand the host role on if needed.
    pub fn disconnect(&mut self, id: Uuid) -> Option<Disconnected> {
        let player = self.player_mut(id).ok()?;
        player.connected = false;
        player.disconnects += 1;
        let generation = player.disconnects;

        let new_host = if self.host_id == id {
            self.reassign_host()
        } else {
            None
        };
        Some(Disconnected {
            generation,
            new_host,
        })
    }

    pub fn reconnect(&mut self, id: Uuid) -> Result<(), RoomError> {
        self.player_mut(id)?.connected = true;
        Ok(())
    }

    /// Remove a player whose grace period ran out. Does nothing if they came
    /// back, or dropped again since `generation` was handed out.
    pub fn expire(&mut self, id: Uuid, generation: u64) -> bool {
        let stale = self
            .player(id)
            .is_some_and(|p| !p.connected && p.disconnects == generation);
        if stale {
            self.players.retain(|p| p.id != id);
        }
        stale
    }

    /// Remove a player outright. Returns the new host, if the host left.
    pub fn remove_player(&mut self, id: Uuid) -> Result<Option<Uuid>, RoomError> {
        if self.player(id).is_none() {
            return Err(RoomError::PlayerNotFound);
        }
        self.players.retain(|p| p.id != id);
        if self.host_id == id {
            return Ok(self.reassign_host());
        }
        Ok(None)
    }

    /// Hand the host role to the first connected player, if any
    fn reassign_host(&mut self) -> Option<Uuid> {
        let next = self
            .players
            .iter()
            .find(|p| p.connected && p.id != self.host_id)?
            .id;
        self.host_id = next;
        Some(next)
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id.clone(),
            players: self.players.iter().map(RoomPlayer::to_info).collect(),
            max_players: self.max_players,
            host_id: self.host_id,
            started: self.started,
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatan_core::Action;
    use pretty_assertions::assert_eq;

    fn seat(name: &str) -> RoomPlayer {
        RoomPlayer::new(Uuid::new_v4(), name.to_string(), "#ff4444".to_string())
    }

    fn room_with(max_players: usize) -> (GameRoom, Uuid) {
        let host = seat("Host");
        let host_id = host.id;
        (GameRoom::new(generate_code(), host, max_players), host_id)
    }

    #[test]
    fn test_room_code_format() {
        let code = generate_code();
        assert_eq!(code.len(), ROOM_CODE_LEN);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_create_room() {
        let (room, host_id) = room_with(4);
        assert_eq!(room.players.len(), 1);
        assert!(!room.is_full());
        assert_eq!(room.host_id, host_id);
        assert!(!room.started);
    }

    #[test]
    fn test_join_failures() {
        let (mut room, host_id) = room_with(2);
        room.join(seat("Two")).unwrap();
        assert_eq!(room.join(seat("Three")), Err(JoinError::Full));
        assert_eq!(JoinError::Full.to_string(), "Room is full");

        for player in &mut room.players {
            player.ready = true;
        }
        room.start(host_id, 7).unwrap();
        assert_eq!(room.join(seat("Late")), Err(JoinError::AlreadyStarted));
        assert_eq!(JoinError::AlreadyStarted.to_string(), "Game already started");
        assert_eq!(JoinError::NotFound.to_string(), "Room not found");
    }

    #[test]
    fn test_start_game_preconditions() {
        let (mut room, host_id) = room_with(4);
        assert_eq!(room.start(host_id, 1), Err(RoomError::NotEnoughPlayers));

        let guest = seat("Guest");
        let guest_id = guest.id;
        room.join(guest).unwrap();
        assert_eq!(room.start(guest_id, 1), Err(RoomError::NotHost));
        assert_eq!(room.start(host_id, 1), Err(RoomError::NotAllReady));

        room.set_ready(host_id, true).unwrap();
        room.set_ready(guest_id, true).unwrap();
        let configs = room.start(host_id, 1).unwrap();

        assert!(room.started);
        assert_eq!(room.seed, Some(1));
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].id, Some(engine_id(host_id)));
        assert_eq!(configs[1].name, "Guest");
        assert_eq!(room.start(host_id, 1), Err(RoomError::AlreadyStarted));
    }

    #[test]
    fn test_record_action_stamps_and_logs() {
        let (mut room, host_id) = room_with(4);
        let envelope = ActionEnvelope::new(&Action::RollDice, 0);
        assert_eq!(
            room.record_action(host_id, envelope.clone()),
            Err(RoomError::NotStarted)
        );

        room.started = true;
        let relayed = room.record_action(host_id, envelope).unwrap();
        assert!(relayed.timestamp > 0);
        assert_eq!(relayed.actor, Some(engine_id(host_id)));
        assert_eq!(room.actions, vec![relayed]);
    }

    #[test]
    fn test_host_disconnect_reassigns_host() {
        let (mut room, host_id) = room_with(4);
        let guest = seat("Guest");
        let guest_id = guest.id;
        room.join(guest).unwrap();

        let outcome = room.disconnect(host_id).unwrap();
        assert_eq!(outcome.new_host, Some(guest_id));
        assert_eq!(room.host_id, guest_id);
        assert!(!room.player(host_id).unwrap().connected);
        assert_eq!(room.connected_ids(None), vec![guest_id]);
    }

    #[test]
    fn test_grace_expiry_respects_reconnects() {
        let (mut room, _) = room_with(4);
        let guest = seat("Guest");
        let guest_id = guest.id;
        room.join(guest).unwrap();

        let first = room.disconnect(guest_id).unwrap();
        room.reconnect(guest_id).unwrap();
        assert!(!room.expire(guest_id, first.generation));

        let second = room.disconnect(guest_id).unwrap();
        assert!(!room.expire(guest_id, first.generation));
        assert!(room.expire(guest_id, second.generation));
        assert!(room.player(guest_id).is_none());
    }

    #[test]
    fn test_remove_last_player_empties_room() {
        let (mut room, host_id) = room_with(4);
        assert_eq!(room.remove_player(host_id), Ok(None));
        assert!(room.is_empty());
        assert_eq!(room.remove_player(host_id), Err(RoomError::PlayerNotFound));
    }
}
