//! Gatan - a hex-tile settlement building game engine
//!
//! This crate provides the core game logic for Gatan, including:
//! - Hex coordinates and board geometry
//! - Board generation with terrain, number tokens and harbors
//! - Player state and resource management
//! - The turn state machine and its rule checks
//! - Action dispatch and replication between peers
//!
//! # Architecture
//!
//! The engine is deterministic. Given the same players, seed, rule set and
//! ordered action list, every instance reaches the same [`GameState`]. All
//! randomness (board layout, dice, deck order, discards, robber steals) comes
//! from a seeded generator that lives inside the state.
//!
//! # Modules
//!
//! - [`hex`]: Axial coordinates and pixel geometry
//! - [`board`]: Board generation and queries
//! - [`player`]: Player state, hands and costs
//! - [`rules`]: Optional rule checks
//! - [`game`]: Game state machine
//! - [`actions`]: Replicated actions, wire envelopes and events
//! - [`dispatcher`]: Local and networked action dispatch
//! - [`rng`]: Serializable seeded random source

pub mod actions;
pub mod board;
pub mod dispatcher;
pub mod game;
pub mod hex;
pub mod player;
pub mod rng;
pub mod rules;

// Re-export commonly used types
pub use actions::{Action, ActionEnvelope, EnvelopeError, GameEvent};
pub use board::{
    Board, Building, BuildingKind, Edge, EdgeId, Harbor, HarborPlacement, Hex, HexId, PlayerId,
    Resource, Road, Terrain, Vertex, VertexId,
};
pub use dispatcher::{replay, DispatchError, Dispatcher, LocalOnly, Session, Transport, TransportError};
pub use game::{GameError, GameState, Phase};
pub use hex::HexCoord;
pub use player::{costs, DevelopmentCard, Player, PlayerConfig, ResourceHand};
pub use rng::GameRng;
pub use rules::{LongestRoadMetric, RuleSet};
