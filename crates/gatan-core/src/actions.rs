//! Game actions that players can take.
//!
//! This module defines every replicated action, the wire envelope actions
//! travel in between peers, and the events the engine reports when an action
//! is applied.

use crate::board::{EdgeId, HexId, PlayerId, Resource, VertexId};
use crate::game::Phase;
use crate::player::{DevelopmentCard, ResourceHand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// All actions a player can take.
///
/// Serializes as `{"type": "BUILD_ROAD", "payload": {"edgeId": 4}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    RollDice,

    #[serde(rename_all = "camelCase")]
    BuildSettlement { vertex_id: VertexId },

    #[serde(rename_all = "camelCase")]
    BuildCity { vertex_id: VertexId },

    #[serde(rename_all = "camelCase")]
    BuildRoad { edge_id: EdgeId },

    EndTurn,

    PlayDevelopmentCard { card: DevelopmentCard },

    BuyDevelopmentCard,

    #[serde(rename_all = "camelCase")]
    MoveRobber {
        hex_id: HexId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_player_id: Option<PlayerId>,
    },

    /// Bank trade. Replicated so every peer applies the same exchange.
    Trade {
        giving: ResourceHand,
        receiving: ResourceHand,
    },
}

impl Action {
    /// Every wire `type` tag, in declaration order
    pub const KINDS: [&'static str; 9] = [
        "ROLL_DICE",
        "BUILD_SETTLEMENT",
        "BUILD_CITY",
        "BUILD_ROAD",
        "END_TURN",
        "PLAY_DEVELOPMENT_CARD",
        "BUY_DEVELOPMENT_CARD",
        "MOVE_ROBBER",
        "TRADE",
    ];

    /// The wire `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Action::RollDice => "ROLL_DICE",
            Action::BuildSettlement { .. } => "BUILD_SETTLEMENT",
            Action::BuildCity { .. } => "BUILD_CITY",
            Action::BuildRoad { .. } => "BUILD_ROAD",
            Action::EndTurn => "END_TURN",
            Action::PlayDevelopmentCard { .. } => "PLAY_DEVELOPMENT_CARD",
            Action::BuyDevelopmentCard => "BUY_DEVELOPMENT_CARD",
            Action::MoveRobber { .. } => "MOVE_ROBBER",
            Action::Trade { .. } => "TRADE",
        }
    }

    fn has_payload(kind: &str) -> bool {
        !matches!(kind, "ROLL_DICE" | "END_TURN" | "BUY_DEVELOPMENT_CARD")
    }
}

/// Errors decoding an envelope into an [`Action`]
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("unknown action type `{0}`")]
    UnknownType(String),

    #[error("invalid payload for {kind}: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Wire format for an action exchanged between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: u64,
    #[serde(rename = "actorPlayerId", default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<PlayerId>,
    /// Per-sender sequence number, starting at 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl ActionEnvelope {
    pub fn new(action: &Action, timestamp: u64) -> Self {
        let payload = match serde_json::to_value(action) {
            Ok(Value::Object(mut map)) => map.remove("payload"),
            _ => None,
        };
        Self {
            kind: action.kind().to_string(),
            payload: payload.unwrap_or_else(|| Value::Object(Default::default())),
            timestamp,
            actor: None,
            seq: None,
        }
    }

    pub fn with_actor(mut self, actor: PlayerId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    /// Decode into a typed action. Payloads of argument-less actions are
    /// ignored.
    pub fn to_action(&self) -> Result<Action, EnvelopeError> {
        if !Action::KINDS.contains(&self.kind.as_str()) {
            return Err(EnvelopeError::UnknownType(self.kind.clone()));
        }

        let mut tagged = serde_json::Map::new();
        tagged.insert("type".to_string(), Value::String(self.kind.clone()));
        if Action::has_payload(&self.kind) {
            tagged.insert("payload".to_string(), self.payload.clone());
        }

        serde_json::from_value(Value::Object(tagged)).map_err(|source| EnvelopeError::InvalidPayload {
            kind: self.kind.clone(),
            source,
        })
    }
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Dice were rolled
    DiceRolled {
        player: PlayerId,
        dice: (u8, u8),
        total: u8,
    },

    /// Resources were distributed after a dice roll
    ResourcesProduced {
        grants: Vec<(PlayerId, Resource, u32)>,
    },

    /// Player lost half their hand to a 7
    CardsDiscarded {
        player: PlayerId,
        discarded: ResourceHand,
    },

    /// A settlement was built
    SettlementBuilt { player: PlayerId, vertex: VertexId },

    /// Resources granted for the second setup settlement
    StartingResourcesGranted {
        player: PlayerId,
        resources: ResourceHand,
    },

    /// A settlement was upgraded to a city
    CityBuilt { player: PlayerId, vertex: VertexId },

    /// A road was built
    RoadBuilt { player: PlayerId, edge: EdgeId },

    /// Bank trade completed
    ResourcesTraded {
        player: PlayerId,
        giving: ResourceHand,
        receiving: ResourceHand,
    },

    /// A development card was purchased
    DevelopmentCardBought {
        player: PlayerId,
        card: DevelopmentCard,
    },

    /// A development card was played
    DevelopmentCardPlayed {
        player: PlayerId,
        card: DevelopmentCard,
    },

    /// The robber was moved
    RobberMoved {
        player: PlayerId,
        from: HexId,
        to: HexId,
    },

    /// A resource was stolen
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Resource,
    },

    /// Longest road changed hands
    LongestRoadChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
    },

    /// Largest army changed hands
    LargestArmyChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
    },

    /// Play passed to another player
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
        phase: Phase,
    },

    /// The host should roll for `player` after a short delay
    AutoRollScheduled { player: PlayerId },

    /// A player won the game
    GameWon {
        player: PlayerId,
        victory_points: u32,
    },
}
