//! Gatan multiplayer relay.
//!
//! The server seats players in rooms and relays action envelopes between
//! them; it never runs the engine itself. Every peer runs its own
//! [`gatan_core::Dispatcher`] and stays in step by applying the relayed
//! actions in the order the server hands them out.
//!
//! - [`config`]: Environment configuration for server and peers
//! - [`protocol`]: WebSocket messages
//! - [`room`]: Room membership and the relayed action log
//! - [`server`]: Connection handling
//! - [`peer`]: Client-side transport and session loop

pub mod config;
pub mod peer;
pub mod protocol;
pub mod room;
pub mod server;

pub use config::{ConfigError, PeerConfig, ServerConfig};
pub use peer::{connect, ChannelTransport, PeerError, PeerSession};
pub use protocol::{ClientMessage, PlayerInfo, RoomInfo, ServerMessage};
pub use room::{GameRoom, JoinError, RoomError, RoomPlayer};
pub use server::{run_server, serve, ServerState};
