//! Client side of the relay: drives a [`Dispatcher`] from server messages.

use crate::config::PeerConfig;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::engine_id;
use futures_util::{SinkExt, StreamExt};
use gatan_core::{
    Action, ActionEnvelope, Dispatcher, GameError, GameEvent, PlayerConfig, RuleSet, Session,
    Transport, TransportError,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Queues outgoing actions on the connection's outbound channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self { tx }
    }
}

impl Transport for ChannelTransport {
    fn broadcast(&mut self, envelope: ActionEnvelope) -> Result<(), TransportError> {
        self.tx
            .send(ClientMessage::GameAction { action: envelope })
            .map_err(|_| TransportError::Closed)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PeerError {
    #[error("game has not started")]
    NotStarted,

    #[error(transparent)]
    Rejected(#[from] GameError),
}

/// Arguments every seat started its engine from
#[derive(Debug, Clone)]
struct StartedGame {
    room_id: String,
    seed: u64,
    players: Vec<PlayerConfig>,
}

/// One seat in a networked game.
pub struct PeerSession {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    rules: RuleSet,
    config: PeerConfig,
    player_id: Option<Uuid>,
    started: Option<StartedGame>,
    dispatcher: Option<Dispatcher<ChannelTransport>>,
    roll_deadline: Option<Instant>,
}

impl PeerSession {
    pub fn new(
        outbound: mpsc::UnboundedSender<ClientMessage>,
        rules: RuleSet,
        config: PeerConfig,
    ) -> Self {
        Self {
            outbound,
            rules,
            config,
            player_id: None,
            started: None,
            dispatcher: None,
            roll_deadline: None,
        }
    }

    pub fn player_id(&self) -> Option<Uuid> {
        self.player_id
    }

    /// The running game, once the server has started it
    pub fn dispatcher(&self) -> Option<&Dispatcher<ChannelTransport>> {
        self.dispatcher.as_ref()
    }

    /// Send a lobby message
    pub fn send(&self, msg: ClientMessage) -> Result<(), TransportError> {
        self.outbound.send(msg).map_err(|_| TransportError::Closed)
    }

    /// Submit a local intent. Fails before the game has started.
    pub fn dispatch(&mut self, action: Action) -> Result<Vec<GameEvent>, PeerError> {
        let dispatcher = self.dispatcher.as_mut().ok_or(PeerError::NotStarted)?;
        let result = dispatcher.dispatch(action);
        self.arm_auto_roll();
        Ok(result?)
    }

    /// Share the local checksum with the rest of the room
    ///
    /// A pending automatic roll is applied first, so the reported state is
    /// the one every peer settles on.
    pub fn report_checksum(&mut self) -> Result<(), TransportError> {
        self.settle_auto_roll();
        let Some(dispatcher) = &self.dispatcher else {
            return Ok(());
        };
        self.send(ClientMessage::StateChecksum {
            checksum: dispatcher.game().state_checksum(),
            action_count: dispatcher.log().len(),
        })
    }

    pub fn handle_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Welcome { player_id } => {
                if self.player_id.is_none() {
                    self.player_id = Some(player_id);
                }
            }
            ServerMessage::RoomCreated { room, player_id }
            | ServerMessage::JoinedRoom { room, player_id } => {
                debug!(room = %room.id, %player_id, "seated");
                self.player_id = Some(player_id);
            }
            ServerMessage::GameStarted {
                room_id,
                seed,
                players,
            } => {
                self.started = Some(StartedGame {
                    room_id,
                    seed,
                    players,
                });
                self.dispatcher = self.fresh_dispatcher();
            }
            ServerMessage::GameActionReceived { action } => self.apply_remote(&action),
            ServerMessage::SyncActions { actions } => {
                info!(actions = actions.len(), "replaying room log");
                self.dispatcher = self.fresh_dispatcher();
                for action in &actions {
                    self.apply_remote(action);
                }
            }
            ServerMessage::StateChecksum {
                player_id,
                checksum,
                action_count,
            } => {
                let local = self.dispatcher.as_ref().map(|d| d.log().len());
                if local == Some(action_count) {
                    self.settle_auto_roll();
                    if let Some(dispatcher) = &self.dispatcher {
                        dispatcher.verify_checksum(&engine_id(player_id), checksum);
                    }
                } else if let Some(local) = local {
                    debug!(
                        peer = %player_id,
                        action_count,
                        local,
                        "checksum taken at a different point, skipping"
                    );
                }
            }
            ServerMessage::JoinFailed { reason } | ServerMessage::Error { message: reason } => {
                warn!(%reason, "server refused request");
            }
            other => debug!(?other, "server message"),
        }
        self.arm_auto_roll();
    }

    /// Apply the pending automatic roll, if any
    pub fn fire_auto_roll(&mut self) -> Option<Result<Vec<GameEvent>, GameError>> {
        self.roll_deadline = None;
        self.dispatcher.as_mut()?.fire_auto_roll()
    }

    /// Apply a pending automatic roll ahead of its timer. It lands at the
    /// same point of the action stream either way.
    fn settle_auto_roll(&mut self) {
        if let Some(Err(err)) = self.fire_auto_roll() {
            debug!(%err, "automatic roll rejected");
        }
    }

    fn fresh_dispatcher(&self) -> Option<Dispatcher<ChannelTransport>> {
        let started = self.started.as_ref()?;
        let Some(player_id) = self.player_id else {
            warn!("game started before a seat was assigned");
            return None;
        };
        Some(Dispatcher::new(
            started.players.clone(),
            started.seed,
            self.rules.clone(),
            Some(Session {
                room_id: started.room_id.clone(),
                local_player: engine_id(player_id),
            }),
            ChannelTransport::new(self.outbound.clone()),
        ))
    }

    fn apply_remote(&mut self, envelope: &ActionEnvelope) {
        let Some(dispatcher) = self.dispatcher.as_mut() else {
            warn!(kind = %envelope.kind, "action received before game start");
            return;
        };
        let Some(from) = envelope.actor.clone() else {
            warn!(kind = %envelope.kind, "action without actor");
            return;
        };
        if let Err(err) = dispatcher.handle_remote_action(envelope, &from) {
            debug!(%err, peer = %from, "remote action rejected");
        }
    }

    /// Start the auto-roll timer when a roll becomes pending
    fn arm_auto_roll(&mut self) {
        let pending = self
            .dispatcher
            .as_ref()
            .is_some_and(|d| d.pending_auto_roll().is_some());
        if !pending {
            self.roll_deadline = None;
        } else if self.roll_deadline.is_none() {
            self.roll_deadline = Some(Instant::now() + self.config.auto_roll_delay);
        }
    }

    /// Multiplex server messages, local intents and the deferred auto roll
    /// until the server side closes.
    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<ServerMessage>,
        mut intents: mpsc::UnboundedReceiver<Action>,
    ) -> Self {
        loop {
            let deadline = self.roll_deadline;
            tokio::select! {
                biased;

                msg = inbound.recv() => match msg {
                    Some(msg) => self.handle_server_message(msg),
                    None => break,
                },
                Some(action) = intents.recv() => {
                    if let Err(err) = self.dispatch(action) {
                        debug!(%err, "local action rejected");
                    }
                }
                _ = sleep_until(deadline), if deadline.is_some() => self.settle_auto_roll(),
            }
        }
        self
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Open a WebSocket to the relay and wire it to a fresh [`PeerSession`].
///
/// Returns the session and the receiver of decoded server messages, ready
/// for [`PeerSession::run`].
pub async fn connect(
    config: PeerConfig,
    rules: RuleSet,
) -> anyhow::Result<(PeerSession, mpsc::UnboundedReceiver<ServerMessage>)> {
    let (ws_stream, _) = connect_async(config.server_url.as_str()).await?;
    info!(url = %config.server_url, "connected to relay");
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<ServerMessage>();

    tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if let Message::Text(text) = msg {
                match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(msg) => {
                        if in_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid server message: {}", e),
                }
            }
        }
    });

    Ok((PeerSession::new(out_tx, rules, config), in_rx))
}
