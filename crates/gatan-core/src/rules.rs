//! Rule-set configuration.
//!
//! The default rule set is permissive. Roads need not connect, any player
//! can be robbed and bank trades are unchecked. Operations are not gated by
//! phase either. Each check can be switched on individually, or all at once
//! with [`RuleSet::strict`].

use serde::{Deserialize, Serialize};

/// How the Longest Road award measures a player's roads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LongestRoadMetric {
    /// Total roads owned
    #[default]
    RoadCount,
    /// Longest simple path through the player's roads
    LongestPath,
}

/// Victory points needed to win by default.
pub const DEFAULT_VICTORY_POINTS: u32 = 10;

/// Minimum road length to claim Longest Road.
pub const MIN_LONGEST_ROAD: u32 = 5;

/// Minimum knights played to claim Largest Army.
pub const MIN_LARGEST_ARMY: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Roads must touch the builder's own building or road
    pub enforce_road_connectivity: bool,
    /// Robber targets must have a building on the robbed hex
    pub enforce_robber_adjacency: bool,
    /// Bank trades must follow 4:1, or the player's 3:1 / 2:1 harbor rates
    pub enforce_trade_ratio: bool,
    /// Operations are rejected outside the phase they belong to
    pub strict_phases: bool,
    /// Every mutation is rejected once a winner is set
    pub halt_on_winner: bool,
    /// Remote actions from anyone but the current player are rejected
    pub enforce_turn_order: bool,
    pub longest_road: LongestRoadMetric,
    pub victory_points_to_win: u32,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            enforce_road_connectivity: false,
            enforce_robber_adjacency: false,
            enforce_trade_ratio: false,
            strict_phases: false,
            halt_on_winner: false,
            enforce_turn_order: false,
            longest_road: LongestRoadMetric::RoadCount,
            victory_points_to_win: DEFAULT_VICTORY_POINTS,
        }
    }
}

impl RuleSet {
    /// Every check enabled, with the longest-path road metric.
    pub fn strict() -> Self {
        Self {
            enforce_road_connectivity: true,
            enforce_robber_adjacency: true,
            enforce_trade_ratio: true,
            strict_phases: true,
            halt_on_winner: true,
            enforce_turn_order: true,
            longest_road: LongestRoadMetric::LongestPath,
            victory_points_to_win: DEFAULT_VICTORY_POINTS,
        }
    }
}
