//! Action dispatch and replication.
//!
//! Every user intent enters through a [`Dispatcher`]. In a local game it goes
//! straight to the engine. In a networked game it is wrapped in an
//! [`ActionEnvelope`], handed to the [`Transport`] and applied locally right
//! away; peers apply the same envelope when it reaches them through
//! [`Dispatcher::handle_remote_action`].
//!
//! Peers converge only if they apply the same actions in the same order.
//! Nothing here reorders or arbitrates: sequence gaps and checksum mismatches
//! are detected and logged, not repaired.
//!
//! Automatic dice rolls are not sent over the wire. Each peer applies its own
//! roll, either when the host's timer calls [`Dispatcher::fire_auto_roll`] or
//! right before the next action is applied, whichever comes first, so the roll
//! always lands at the same point in every peer's action stream.

use crate::actions::{Action, ActionEnvelope, EnvelopeError, GameEvent};
use crate::board::{EdgeId, HexId, PlayerId, VertexId};
use crate::game::{GameError, GameState};
use crate::player::{DevelopmentCard, PlayerConfig, ResourceHand};
use crate::rules::RuleSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the broadcast side of a transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,

    #[error("failed to send: {0}")]
    Send(String),
}

/// Outbound half of the replication transport.
pub trait Transport {
    /// Send an envelope to every other peer in the session.
    fn broadcast(&mut self, envelope: ActionEnvelope) -> Result<(), TransportError>;
}

/// Transport for hotseat games: nothing leaves the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalOnly;

impl Transport for LocalOnly {
    fn broadcast(&mut self, _envelope: ActionEnvelope) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Errors from dispatching or receiving an action
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Rejected(#[from] GameError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Networked session this dispatcher belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub room_id: String,
    pub local_player: PlayerId,
}

/// Single entry point for game intents.
pub struct Dispatcher<T: Transport> {
    game: GameState,
    configs: Vec<PlayerConfig>,
    session: Option<Session>,
    transport: T,
    next_seq: u64,
    last_seen: BTreeMap<PlayerId, u64>,
    pending_auto_roll: Option<PlayerId>,
    log: Vec<Action>,
}

impl Dispatcher<LocalOnly> {
    /// Hotseat game: no session, no broadcast.
    pub fn local(configs: Vec<PlayerConfig>, seed: u64, rules: RuleSet) -> Self {
        Self::new(configs, seed, rules, None, LocalOnly)
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(
        configs: Vec<PlayerConfig>,
        seed: u64,
        rules: RuleSet,
        session: Option<Session>,
        transport: T,
    ) -> Self {
        let game = GameState::with_rules(configs.clone(), seed, rules);
        info!(
            seed,
            players = game.players.len(),
            multiplayer = session.is_some(),
            "game initialized"
        );
        Self {
            game,
            configs,
            session,
            transport,
            next_seq: 0,
            last_seen: BTreeMap::new(),
            pending_auto_roll: None,
            log: Vec::new(),
        }
    }

    /// Read-only view of the engine state
    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_multiplayer(&self) -> bool {
        self.session.is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Every action handed to the engine so far, accepted or not, excluding
    /// automatic rolls
    pub fn log(&self) -> &[Action] {
        &self.log
    }

    /// Player an automatic roll is waiting for, if any
    pub fn pending_auto_roll(&self) -> Option<&PlayerId> {
        self.pending_auto_roll.as_ref()
    }

    /// Submit a local intent.
    ///
    /// In a networked game the action is broadcast first and then applied
    /// locally whatever the broadcast outcome.
    pub fn dispatch(&mut self, action: Action) -> Result<Vec<GameEvent>, GameError> {
        if let Some(session) = &self.session {
            if self.game.rules.enforce_turn_order && session.local_player != self.game.current_player
            {
                return Err(GameError::NotYourTurn);
            }

            self.next_seq += 1;
            let envelope = ActionEnvelope::new(&action, now_millis())
                .with_actor(session.local_player.clone())
                .with_seq(self.next_seq);
            if let Err(err) = self.transport.broadcast(envelope) {
                warn!(%err, kind = action.kind(), "failed to broadcast action");
            }
        }

        self.apply(action)
    }

    /// Apply an action received from a peer.
    pub fn handle_remote_action(
        &mut self,
        envelope: &ActionEnvelope,
        from: &PlayerId,
    ) -> Result<Vec<GameEvent>, DispatchError> {
        self.track_sequence(from, envelope.seq);

        let action = envelope.to_action().map_err(|err| {
            warn!(%err, peer = %from, "ignoring remote action");
            err
        })?;

        self.flush_auto_roll();
        if from != &self.game.current_player {
            if self.game.rules.enforce_turn_order {
                warn!(peer = %from, kind = action.kind(), "rejecting out-of-turn action");
                return Err(GameError::NotYourTurn.into());
            }
            debug!(peer = %from, kind = action.kind(), "applying out-of-turn action");
        }

        Ok(self.apply(action)?)
    }

    /// Apply the pending automatic roll now. Local only, never broadcast.
    pub fn fire_auto_roll(&mut self) -> Option<Result<Vec<GameEvent>, GameError>> {
        let player = self.pending_auto_roll.take()?;
        debug!(%player, "automatic dice roll");
        let result = self.game.roll_dice();
        if let Ok(events) = &result {
            self.note_events(events);
        }
        Some(result)
    }

    /// Compare a peer's reported checksum with local state.
    pub fn verify_checksum(&self, from: &PlayerId, checksum: u64) -> bool {
        let local = self.game.state_checksum();
        if local != checksum {
            warn!(peer = %from, local, remote = checksum, "game state diverged");
            return false;
        }
        true
    }

    fn flush_auto_roll(&mut self) {
        if let Some(Err(err)) = self.fire_auto_roll() {
            debug!(%err, "automatic roll rejected");
        }
    }

    fn apply(&mut self, action: Action) -> Result<Vec<GameEvent>, GameError> {
        self.flush_auto_roll();

        let result = self.game.apply(&action);
        match &result {
            Ok(events) => self.note_events(events),
            Err(err) => debug!(%err, kind = action.kind(), "action rejected"),
        }
        self.log.push(action);
        result
    }

    fn note_events(&mut self, events: &[GameEvent]) {
        for event in events {
            match event {
                GameEvent::AutoRollScheduled { player } => {
                    self.pending_auto_roll = Some(player.clone());
                }
                GameEvent::GameWon {
                    player,
                    victory_points,
                } => {
                    info!(
                        %player,
                        victory_points,
                        scores = ?self.game.scoreboard(),
                        "game won"
                    );
                }
                _ => {}
            }
        }
    }

    fn track_sequence(&mut self, from: &PlayerId, seq: Option<u64>) {
        let Some(seq) = seq else {
            return;
        };
        // Our own actions only come back through a log replay after a
        // reconnect; carry on numbering from where we left off.
        if self.session.as_ref().is_some_and(|s| &s.local_player == from) {
            self.next_seq = self.next_seq.max(seq);
        }
        let last = self.last_seen.get(from).copied().unwrap_or(0);
        if seq <= last {
            warn!(peer = %from, seq, last, "duplicate or reordered action");
            return;
        }
        if seq > last + 1 {
            warn!(peer = %from, seq, expected = last + 1, "gap in action sequence");
        }
        self.last_seen.insert(from.clone(), seq);
    }

    // ==================== Intents ====================

    pub fn roll_dice(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::RollDice)
    }

    pub fn build_settlement(&mut self, vertex_id: VertexId) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::BuildSettlement { vertex_id })
    }

    pub fn build_city(&mut self, vertex_id: VertexId) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::BuildCity { vertex_id })
    }

    pub fn build_road(&mut self, edge_id: EdgeId) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::BuildRoad { edge_id })
    }

    pub fn trade(
        &mut self,
        giving: ResourceHand,
        receiving: ResourceHand,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::Trade { giving, receiving })
    }

    pub fn buy_development_card(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::BuyDevelopmentCard)
    }

    pub fn play_development_card(
        &mut self,
        card: DevelopmentCard,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::PlayDevelopmentCard { card })
    }

    pub fn move_robber(
        &mut self,
        hex_id: HexId,
        target_player_id: Option<PlayerId>,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::MoveRobber {
            hex_id,
            target_player_id,
        })
    }

    pub fn end_turn(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.dispatch(Action::EndTurn)
    }

    /// Rebuild this game from scratch by replaying its log.
    pub fn replay(&self) -> Dispatcher<LocalOnly> {
        replay(
            self.configs.clone(),
            self.game.seed(),
            self.game.rules.clone(),
            &self.log,
        )
    }
}

/// Rebuild a game from its starting parameters and action log.
///
/// Rejected actions are replayed too; they leave the state alone, but they
/// still fix where pending automatic rolls land.
///
/// A roll scheduled by the last logged action is left pending, since the log
/// cannot tell whether it already fired. Call [`Dispatcher::fire_auto_roll`]
/// before comparing against a peer that has rolled.
pub fn replay(
    configs: Vec<PlayerConfig>,
    seed: u64,
    rules: RuleSet,
    log: &[Action],
) -> Dispatcher<LocalOnly> {
    let mut dispatcher = Dispatcher::local(configs, seed, rules);
    for action in log {
        let _ = dispatcher.apply(action.clone());
    }
    dispatcher
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
