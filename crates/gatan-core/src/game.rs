//! Core game state machine.
//!
//! This module contains the main `GameState` struct and all game logic. Every
//! operation acts on behalf of the current player and returns the events it
//! produced; an `Err` leaves the state untouched.

use crate::actions::{Action, GameEvent};
use crate::board::{Board, BuildingKind, EdgeId, Harbor, HexId, PlayerId, Resource, VertexId};
use crate::player::{costs, DevelopmentCard, Player, PlayerConfig, ResourceHand};
use crate::rng::GameRng;
use crate::rules::{LongestRoadMetric, RuleSet, MIN_LARGEST_ARMY, MIN_LONGEST_ROAD};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use thiserror::Error;

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// First placement round, forward seat order
    #[serde(rename = "setup-settlement-1")]
    SetupSettlement1,
    #[serde(rename = "setup-road-1")]
    SetupRoad1,
    /// Second placement round, reverse seat order
    #[serde(rename = "setup-settlement-2")]
    SetupSettlement2,
    #[serde(rename = "setup-road-2")]
    SetupRoad2,
    /// Awaiting a roll. The engine goes straight to `MainTurn` and rolls on
    /// request, so this is never entered.
    RollDice,
    MainTurn,
    /// Discards after a 7 are automatic; never entered.
    DiscardCards,
    MoveRobber,
    /// Steals happen inside `move_robber`; never entered.
    StealCard,
    /// Entered on a win only when the rule set halts the game.
    GameOver,
}

impl Phase {
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Phase::SetupSettlement1 | Phase::SetupRoad1 | Phase::SetupSettlement2 | Phase::SetupRoad2
        )
    }
}

/// Why an operation was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for phase {0:?}")]
    WrongPhase(Phase),

    #[error("Dice have not been rolled this turn")]
    NotRolled,

    #[error("Unknown vertex {0}")]
    UnknownVertex(VertexId),

    #[error("Unknown edge {0}")]
    UnknownEdge(EdgeId),

    #[error("Unknown hex {0}")]
    UnknownHex(HexId),

    #[error("Location already occupied")]
    Occupied,

    #[error("No own settlement at {0}")]
    NotOwnSettlement(VertexId),

    #[error("Road is not connected to your network")]
    NotConnected,

    #[error("Cannot afford this")]
    CannotAfford,

    #[error("No pieces remaining")]
    NoPiecesRemaining,

    #[error("No development cards left in deck")]
    EmptyDeck,

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("Invalid trade")]
    InvalidTrade,

    #[error("{0} has no building on the robbed hex")]
    IneligibleTarget(PlayerId),

    #[error("Game is over")]
    GameOver,
}

/// The complete game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// All players, in seat order
    pub players: Vec<Player>,
    pub current_player: PlayerId,
    pub phase: Phase,
    /// Turn number (starts at 1, bumped by every `end_turn`)
    pub turn: u32,
    pub board: Board,
    /// Last dice roll, cleared when the turn ends
    pub dice_roll: Option<(u8, u8)>,
    /// Set once by the first player to reach the victory threshold
    pub winner: Option<PlayerId>,
    /// Development card draw pile; the top card is index 0
    pub dev_deck: Vec<DevelopmentCard>,
    pub rules: RuleSet,
    rng: GameRng,
}

impl GameState {
    /// Create a new game with the default rule set
    pub fn new(configs: Vec<PlayerConfig>, seed: u64) -> Self {
        Self::with_rules(configs, seed, RuleSet::default())
    }

    /// Create a new game.
    ///
    /// An empty config list seats the four default hotseat players. The seed
    /// drives board generation, the deck shuffle and every later roll, so two
    /// games built from the same arguments stay identical under the same
    /// actions.
    pub fn with_rules(configs: Vec<PlayerConfig>, seed: u64, rules: RuleSet) -> Self {
        let configs = if configs.is_empty() {
            PlayerConfig::default_seats()
        } else {
            configs
        };

        let players: Vec<Player> = configs
            .into_iter()
            .enumerate()
            .map(|(i, config)| {
                let id = config
                    .id
                    .unwrap_or_else(|| PlayerId::new(format!("player-{}", i + 1)));
                Player::new(id, config.name, config.color)
            })
            .collect();

        let mut rng = GameRng::new(seed);
        let board = Board::generate(&mut rng);

        let mut dev_deck = DevelopmentCard::standard_deck();
        rng.shuffle(&mut dev_deck);

        Self {
            current_player: players[0].id.clone(),
            players,
            phase: Phase::SetupSettlement1,
            turn: 1,
            board,
            dice_roll: None,
            winner: None,
            dev_deck,
            rules,
            rng,
        }
    }

    /// The seed this game was created from
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Get a player by ID
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    fn player_index(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == id)
    }

    fn current_index(&self) -> usize {
        self.player_index(&self.current_player).unwrap_or(0)
    }

    /// The player whose turn it is
    pub fn current(&self) -> &Player {
        &self.players[self.current_index()]
    }

    fn current_mut(&mut self) -> &mut Player {
        let idx = self.current_index();
        &mut self.players[idx]
    }

    /// Victory points for a player, recomputed from scratch (0 if unknown)
    pub fn victory_points(&self, id: &PlayerId) -> u32 {
        self.player(id).map_or(0, Player::victory_points)
    }

    /// Every player's victory points, in seat order
    pub fn scoreboard(&self) -> Vec<(PlayerId, u32)> {
        self.players
            .iter()
            .map(|p| (p.id.clone(), p.victory_points()))
            .collect()
    }

    /// Hash of the canonical JSON encoding of the whole state.
    ///
    /// Two peers that applied the same actions to the same seed report the
    /// same value.
    pub fn state_checksum(&self) -> u64 {
        let mut hasher = FxHasher::default();
        if let Ok(bytes) = serde_json::to_vec(self) {
            hasher.write(&bytes);
        }
        hasher.finish()
    }

    // ==================== Precondition Helpers ====================

    fn ensure_running(&self) -> Result<(), GameError> {
        if self.rules.halt_on_winner && self.winner.is_some() {
            return Err(GameError::GameOver);
        }
        Ok(())
    }

    fn ensure_phase(&self, allowed: &[Phase]) -> Result<(), GameError> {
        if self.rules.strict_phases && !allowed.contains(&self.phase) {
            return Err(GameError::WrongPhase(self.phase));
        }
        Ok(())
    }

    /// Main-turn actions that need the dice rolled first
    fn ensure_rolled(&self) -> Result<(), GameError> {
        if self.rules.strict_phases && self.phase == Phase::MainTurn && self.dice_roll.is_none() {
            return Err(GameError::NotRolled);
        }
        Ok(())
    }

    // ==================== Operations ====================

    /// Apply an action as the current player
    pub fn apply(&mut self, action: &Action) -> Result<Vec<GameEvent>, GameError> {
        match action {
            Action::RollDice => self.roll_dice(),
            Action::BuildSettlement { vertex_id } => self.build_settlement(*vertex_id),
            Action::BuildCity { vertex_id } => self.build_city(*vertex_id),
            Action::BuildRoad { edge_id } => self.build_road(*edge_id),
            Action::EndTurn => self.end_turn(),
            Action::PlayDevelopmentCard { card } => self.play_development_card(*card),
            Action::BuyDevelopmentCard => self.buy_development_card(),
            Action::MoveRobber {
                hex_id,
                target_player_id,
            } => self.move_robber(*hex_id, target_player_id.as_ref()),
            Action::Trade { giving, receiving } => self.trade(giving, receiving),
        }
    }

    /// Roll two dice. A 7 halves every hand above seven cards and calls for
    /// the robber; anything else produces resources.
    pub fn roll_dice(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_phase(&[Phase::MainTurn])?;
        if self.rules.strict_phases && self.dice_roll.is_some() {
            return Err(GameError::WrongPhase(self.phase));
        }

        let dice = (self.rng.roll_die(), self.rng.roll_die());
        let total = dice.0 + dice.1;
        self.dice_roll = Some(dice);

        let mut events = vec![GameEvent::DiceRolled {
            player: self.current_player.clone(),
            dice,
            total,
        }];

        if total == 7 {
            for idx in 0..self.players.len() {
                let hand = self.players[idx].resources.total();
                if hand > 7 {
                    let keep = hand / 2;
                    let discarded = self.players[idx]
                        .resources
                        .discard_random(hand - keep, &mut self.rng);
                    events.push(GameEvent::CardsDiscarded {
                        player: self.players[idx].id.clone(),
                        discarded,
                    });
                }
            }
            self.phase = Phase::MoveRobber;
        } else {
            let grants = self.board.resources_for_roll(total);
            for (owner, resource, amount) in &grants {
                if let Some(idx) = self.player_index(owner) {
                    self.players[idx].resources.add(*resource, *amount);
                }
            }
            if !grants.is_empty() {
                events.push(GameEvent::ResourcesProduced { grants });
            }

            events.extend(self.update_longest_road());
            events.extend(self.update_largest_army());
            self.phase = Phase::MainTurn;
            events.extend(self.check_winner());
        }

        Ok(events)
    }

    /// Build a settlement. Free during setup; the second setup settlement
    /// also grants one resource per adjacent producing hex.
    pub fn build_settlement(&mut self, vertex: VertexId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_phase(&[Phase::SetupSettlement1, Phase::SetupSettlement2, Phase::MainTurn])?;
        self.ensure_rolled()?;

        if self.current().settlements_remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        let site = self
            .board
            .vertex(vertex)
            .ok_or(GameError::UnknownVertex(vertex))?;
        if site.building.is_some() {
            return Err(GameError::Occupied);
        }

        let phase = self.phase;
        if !phase.is_setup() && !self.current_mut().resources.try_subtract(&costs::settlement()) {
            return Err(GameError::CannotAfford);
        }

        let player = self.current_player.clone();
        self.board.place_settlement(vertex, player.clone());
        self.current_mut().settlements_remaining -= 1;

        let mut events = vec![GameEvent::SettlementBuilt {
            player: player.clone(),
            vertex,
        }];

        if phase == Phase::SetupSettlement2 {
            let mut granted = ResourceHand::new();
            for resource in self.board.starting_resources(vertex) {
                granted.add(resource, 1);
            }
            self.current_mut().resources.add_hand(&granted);
            events.push(GameEvent::StartingResourcesGranted {
                player,
                resources: granted,
            });
        }

        match phase {
            Phase::SetupSettlement1 => self.phase = Phase::SetupRoad1,
            Phase::SetupSettlement2 => self.phase = Phase::SetupRoad2,
            Phase::MainTurn => events.extend(self.check_winner()),
            _ => {}
        }

        Ok(events)
    }

    /// Upgrade one of the current player's settlements to a city
    pub fn build_city(&mut self, vertex: VertexId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_phase(&[Phase::MainTurn])?;
        self.ensure_rolled()?;

        if self.current().cities_remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        let site = self
            .board
            .vertex(vertex)
            .ok_or(GameError::UnknownVertex(vertex))?;
        let own_settlement = site.building.as_ref().is_some_and(|b| {
            b.kind == BuildingKind::Settlement && b.owner == self.current_player
        });
        if !own_settlement {
            return Err(GameError::NotOwnSettlement(vertex));
        }
        if !self.current_mut().resources.try_subtract(&costs::city()) {
            return Err(GameError::CannotAfford);
        }

        self.board.upgrade_to_city(vertex);
        let player = self.current_mut();
        player.settlements_remaining += 1;
        player.cities_remaining -= 1;

        let mut events = vec![GameEvent::CityBuilt {
            player: self.current_player.clone(),
            vertex,
        }];
        events.extend(self.check_winner());
        Ok(events)
    }

    /// Build a road. Completing a setup road passes play along the snake
    /// order; the last one starts the main game.
    pub fn build_road(&mut self, edge: EdgeId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_phase(&[Phase::SetupRoad1, Phase::SetupRoad2, Phase::MainTurn])?;
        self.ensure_rolled()?;

        if self.current().roads_remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        let site = self.board.edge(edge).ok_or(GameError::UnknownEdge(edge))?;
        if site.road.is_some() {
            return Err(GameError::Occupied);
        }
        if self.rules.enforce_road_connectivity
            && !self.board.is_connected_to_network(edge, &self.current_player)
        {
            return Err(GameError::NotConnected);
        }

        let phase = self.phase;
        if !phase.is_setup() && !self.current_mut().resources.try_subtract(&costs::road()) {
            return Err(GameError::CannotAfford);
        }

        let player = self.current_player.clone();
        self.board.place_road(edge, player.clone());
        self.current_mut().roads_remaining -= 1;

        let mut events = vec![GameEvent::RoadBuilt {
            player: player.clone(),
            edge,
        }];

        if phase == Phase::MainTurn {
            events.extend(self.update_longest_road());
        }

        let idx = self.current_index();
        let count = self.players.len();
        let next = match phase {
            Phase::SetupRoad1 => {
                let next = (idx + 1) % count;
                if next == 0 {
                    Some((count - 1, Phase::SetupSettlement2))
                } else {
                    Some((next, Phase::SetupSettlement1))
                }
            }
            Phase::SetupRoad2 if idx == 0 => Some((0, Phase::MainTurn)),
            Phase::SetupRoad2 => Some((idx - 1, Phase::SetupSettlement2)),
            _ => None,
        };

        if let Some((next_idx, next_phase)) = next {
            self.phase = next_phase;
            self.current_player = self.players[next_idx].id.clone();
            if next_idx != idx {
                events.push(GameEvent::TurnEnded {
                    player,
                    next_player: self.current_player.clone(),
                    phase: next_phase,
                });
            }
            if next_phase == Phase::MainTurn {
                events.push(GameEvent::AutoRollScheduled {
                    player: self.current_player.clone(),
                });
            }
        }

        Ok(events)
    }

    /// Exchange resources with the bank
    pub fn trade(
        &mut self,
        giving: &ResourceHand,
        receiving: &ResourceHand,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_phase(&[Phase::MainTurn])?;
        self.ensure_rolled()?;

        if self.rules.enforce_trade_ratio {
            let harbors = self.board.player_harbors(&self.current_player);
            validate_trade_ratio(giving, receiving, &harbors)?;
        }
        let mut hand = self.current().resources.clone();
        if !hand.try_subtract(giving) {
            return Err(GameError::CannotAfford);
        }
        let hand = hand
            .checked_add_hand(receiving)
            .ok_or(GameError::InvalidTrade)?;
        self.current_mut().resources = hand;

        Ok(vec![GameEvent::ResourcesTraded {
            player: self.current_player.clone(),
            giving: giving.clone(),
            receiving: receiving.clone(),
        }])
    }

    /// Draw the top card of the development deck
    pub fn buy_development_card(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_phase(&[Phase::MainTurn])?;
        self.ensure_rolled()?;

        if self.dev_deck.is_empty() {
            return Err(GameError::EmptyDeck);
        }
        if !self
            .current_mut()
            .resources
            .try_subtract(&costs::development_card())
        {
            return Err(GameError::CannotAfford);
        }

        let card = self.dev_deck.remove(0);
        self.current_mut().dev_cards.push(card);

        Ok(vec![GameEvent::DevelopmentCardBought {
            player: self.current_player.clone(),
            card,
        }])
    }

    /// Play a development card.
    ///
    /// A knight counts toward Largest Army and calls for the robber. Road
    /// building, year of plenty and monopoly are consumed without effect.
    /// Victory point cards score while held, so playing one forfeits its point.
    pub fn play_development_card(
        &mut self,
        card: DevelopmentCard,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_phase(&[Phase::MainTurn])?;

        if !self.current_mut().remove_dev_card(card) {
            return Err(GameError::NoSuchCard);
        }

        let mut events = vec![GameEvent::DevelopmentCardPlayed {
            player: self.current_player.clone(),
            card,
        }];

        if card == DevelopmentCard::Knight {
            self.current_mut().knights_played += 1;
            self.phase = Phase::MoveRobber;
            events.extend(self.update_largest_army());
        }

        events.extend(self.check_winner());
        Ok(events)
    }

    /// Move the robber and optionally steal one resource from `target`.
    ///
    /// The stolen type is drawn uniformly from the types the target holds.
    pub fn move_robber(
        &mut self,
        hex: HexId,
        target: Option<&PlayerId>,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_phase(&[Phase::MoveRobber])?;

        if self.board.hex(hex).is_none() {
            return Err(GameError::UnknownHex(hex));
        }
        let target = target.filter(|t| **t != self.current_player);
        if let Some(target) = target {
            if self.rules.enforce_robber_adjacency
                && !self.board.players_adjacent_to_hex(hex).contains(target)
            {
                return Err(GameError::IneligibleTarget(target.clone()));
            }
        }

        let thief = self.current_player.clone();
        let from = self.board.robber_hex();
        self.board.move_robber(hex);

        let mut events = vec![GameEvent::RobberMoved {
            player: thief.clone(),
            from,
            to: hex,
        }];

        if let Some(victim_idx) = target.and_then(|t| self.player_index(t)) {
            let stolen = self.players[victim_idx]
                .resources
                .take_random_type(&mut self.rng);
            if let Some(resource) = stolen {
                self.current_mut().resources.add(resource, 1);
                events.push(GameEvent::ResourceStolen {
                    thief,
                    victim: self.players[victim_idx].id.clone(),
                    resource,
                });
            }
        }

        self.phase = Phase::MainTurn;
        Ok(events)
    }

    /// Pass play to the next player: forward in the main game, backward
    /// during the second setup round.
    pub fn end_turn(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_running()?;
        self.ensure_phase(&[Phase::MainTurn])?;
        if self.rules.strict_phases && self.dice_roll.is_none() {
            return Err(GameError::NotRolled);
        }

        let idx = self.current_index();
        let (next_idx, next_phase) = match self.phase {
            Phase::SetupSettlement2 | Phase::SetupRoad2 if idx == 0 => (0, Phase::MainTurn),
            Phase::SetupSettlement2 | Phase::SetupRoad2 => (idx - 1, self.phase),
            phase => ((idx + 1) % self.players.len(), phase),
        };

        let player = std::mem::replace(&mut self.current_player, self.players[next_idx].id.clone());
        self.phase = next_phase;
        self.dice_roll = None;
        self.turn += 1;

        let mut events = vec![GameEvent::TurnEnded {
            player,
            next_player: self.current_player.clone(),
            phase: next_phase,
        }];
        if next_phase == Phase::MainTurn {
            events.push(GameEvent::AutoRollScheduled {
                player: self.current_player.clone(),
            });
        }
        Ok(events)
    }

    // ==================== Awards ====================

    fn road_score(&self, player: &PlayerId) -> u32 {
        match self.rules.longest_road {
            LongestRoadMetric::RoadCount => self.board.road_count(player),
            LongestRoadMetric::LongestPath => self.board.longest_road(player),
        }
    }

    /// Recompute Longest Road: below the minimum nobody holds it, a tie
    /// leaves it where it is, otherwise the unique leader takes it.
    fn update_longest_road(&mut self) -> Vec<GameEvent> {
        let scores: Vec<u32> = self.players.iter().map(|p| self.road_score(&p.id)).collect();
        let previous = self.players.iter().find(|p| p.has_longest_road).map(|p| p.id.clone());

        if let Some(holder) = award_holder(&scores, MIN_LONGEST_ROAD) {
            for (idx, player) in self.players.iter_mut().enumerate() {
                player.has_longest_road = holder == Some(idx);
            }
        }

        let current = self.players.iter().find(|p| p.has_longest_road).map(|p| p.id.clone());
        if previous == current {
            return Vec::new();
        }
        vec![GameEvent::LongestRoadChanged { previous, current }]
    }

    /// Recompute Largest Army with the same tie and minimum rules
    fn update_largest_army(&mut self) -> Vec<GameEvent> {
        let knights: Vec<u32> = self.players.iter().map(|p| p.knights_played).collect();
        let previous = self.players.iter().find(|p| p.has_largest_army).map(|p| p.id.clone());

        if let Some(holder) = award_holder(&knights, MIN_LARGEST_ARMY) {
            for (idx, player) in self.players.iter_mut().enumerate() {
                player.has_largest_army = holder == Some(idx);
            }
        }

        let current = self.players.iter().find(|p| p.has_largest_army).map(|p| p.id.clone());
        if previous == current {
            return Vec::new();
        }
        vec![GameEvent::LargestArmyChanged { previous, current }]
    }

    fn check_winner(&mut self) -> Vec<GameEvent> {
        if self.winner.is_some() {
            return Vec::new();
        }

        let threshold = self.rules.victory_points_to_win;
        let Some(player) = self.players.iter().find(|p| p.victory_points() >= threshold) else {
            return Vec::new();
        };
        let (id, victory_points) = (player.id.clone(), player.victory_points());

        self.winner = Some(id.clone());
        if self.rules.halt_on_winner {
            self.phase = Phase::GameOver;
        }
        vec![GameEvent::GameWon {
            player: id,
            victory_points,
        }]
    }
}

/// Award outcome for per-seat scores.
///
/// `None` means leave the flags alone (a tie at the top); `Some(None)` clears
/// them; `Some(Some(i))` hands the award to seat `i`.
fn award_holder(scores: &[u32], minimum: u32) -> Option<Option<usize>> {
    let best = scores.iter().copied().max().unwrap_or(0);
    if best < minimum {
        return Some(None);
    }
    let mut leaders = scores.iter().enumerate().filter(|(_, s)| **s == best);
    match (leaders.next(), leaders.next()) {
        (Some((idx, _)), None) => Some(Some(idx)),
        _ => None,
    }
}

/// Rate for trading with the bank without a harbor
const BANK_RATE: u32 = 4;

/// Best rate the given harbors offer for a resource
fn maritime_rate(resource: Resource, harbors: &[Harbor]) -> u32 {
    harbors
        .iter()
        .filter(|h| match h {
            Harbor::Generic => true,
            Harbor::Specific(r) => *r == resource,
        })
        .map(Harbor::rate)
        .min()
        .unwrap_or(BANK_RATE)
}

/// Every given type must come in whole multiples of its rate, and each
/// multiple buys exactly one received card of a different type.
fn validate_trade_ratio(
    giving: &ResourceHand,
    receiving: &ResourceHand,
    harbors: &[Harbor],
) -> Result<(), GameError> {
    let mut credits = 0;
    for resource in Resource::ALL {
        let amount = giving.get(resource);
        if amount == 0 {
            continue;
        }
        if receiving.get(resource) > 0 {
            return Err(GameError::InvalidTrade);
        }
        let rate = maritime_rate(resource, harbors);
        if amount % rate != 0 {
            return Err(GameError::InvalidTrade);
        }
        credits += amount / rate;
    }

    if credits == 0 || credits != receiving.total() {
        return Err(GameError::InvalidTrade);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_player_game() -> GameState {
        GameState::new(
            vec![
                PlayerConfig::with_id("a", "Alice", "#ff4444"),
                PlayerConfig::with_id("b", "Bob", "#4444ff"),
            ],
            7,
        )
    }

    fn empty_vertex(game: &GameState) -> VertexId {
        game.board
            .vertices()
            .iter()
            .find(|v| v.building.is_none())
            .map(|v| v.id)
            .expect("free vertex")
    }

    fn free_edge_at(game: &GameState, vertex: VertexId) -> EdgeId {
        game.board.vertices()[vertex.index()]
            .edges
            .iter()
            .copied()
            .find(|e| game.board.edges()[e.index()].road.is_none())
            .expect("free edge")
    }

    #[test]
    fn test_new_game_starts_in_setup() {
        let game = two_player_game();
        assert_eq!(game.phase, Phase::SetupSettlement1);
        assert_eq!(game.current_player, PlayerId::from("a"));
        assert_eq!(game.turn, 1);
        assert_eq!(game.dev_deck.len(), 25);
        assert!(game.winner.is_none());
    }

    #[test]
    fn test_default_seats() {
        let game = GameState::new(Vec::new(), 1);
        let ids: Vec<&str> = game.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["player-1", "player-2", "player-3", "player-4"]);
        assert_eq!(game.players[3].color, "#ffaa00");
    }

    #[test]
    fn test_phase_wire_names() {
        assert_eq!(
            serde_json::to_string(&Phase::SetupSettlement1).unwrap(),
            "\"setup-settlement-1\""
        );
        assert_eq!(serde_json::to_string(&Phase::MoveRobber).unwrap(), "\"move-robber\"");
    }

    #[test]
    fn test_occupied_vertex_is_rejected_without_change() {
        let mut game = two_player_game();
        let v = empty_vertex(&game);
        game.build_settlement(v).unwrap();
        let before = game.clone();

        assert_eq!(game.build_settlement(v), Err(GameError::Occupied));
        assert_eq!(game, before);
    }

    #[test]
    fn test_unaffordable_main_turn_settlement() {
        let mut game = two_player_game();
        game.phase = Phase::MainTurn;
        let v = empty_vertex(&game);
        let before = game.clone();

        assert_eq!(game.build_settlement(v), Err(GameError::CannotAfford));
        assert_eq!(game, before);
    }

    #[test]
    fn test_second_settlement_grants_starting_resources() {
        let mut game = two_player_game();
        game.phase = Phase::SetupSettlement2;
        let center = game.board.hexes()[9].clone();
        let v = center.vertices[0];
        let expected = game.board.starting_resources(v).len() as u32;

        game.build_settlement(v).unwrap();
        assert_eq!(game.current().resources.total(), expected);
        assert_eq!(game.phase, Phase::SetupRoad2);
    }

    #[test]
    fn test_city_requires_own_settlement() {
        let mut game = two_player_game();
        let v = empty_vertex(&game);
        game.build_settlement(v).unwrap();

        game.phase = Phase::MainTurn;
        game.current_player = PlayerId::from("b");
        game.players[1].resources = ResourceHand::with_amounts(0, 0, 0, 2, 3);
        assert_eq!(game.build_city(v), Err(GameError::NotOwnSettlement(v)));
    }

    #[test]
    fn test_setup_road_one_wraps_to_last_player() {
        let mut game = two_player_game();
        game.current_player = PlayerId::from("b");
        game.phase = Phase::SetupSettlement1;
        let v = empty_vertex(&game);
        game.build_settlement(v).unwrap();
        game.build_road(free_edge_at(&game, v)).unwrap();

        assert_eq!(game.phase, Phase::SetupSettlement2);
        assert_eq!(game.current_player, PlayerId::from("b"));
    }

    #[test]
    fn test_last_setup_road_starts_main_game() {
        let mut game = two_player_game();
        game.phase = Phase::SetupSettlement2;
        let v = empty_vertex(&game);
        game.build_settlement(v).unwrap();
        let events = game.build_road(free_edge_at(&game, v)).unwrap();

        assert_eq!(game.phase, Phase::MainTurn);
        assert_eq!(game.current_player, PlayerId::from("a"));
        assert!(events.contains(&GameEvent::AutoRollScheduled {
            player: PlayerId::from("a")
        }));
    }

    #[test]
    fn test_main_turn_road_costs_resources() {
        let mut game = two_player_game();
        game.phase = Phase::MainTurn;
        let v = empty_vertex(&game);
        let e = free_edge_at(&game, v);
        assert_eq!(game.build_road(e), Err(GameError::CannotAfford));

        game.players[0].resources = ResourceHand::with_amounts(1, 1, 0, 0, 0);
        game.build_road(e).unwrap();
        assert!(game.players[0].resources.is_empty());
        assert_eq!(game.players[0].roads_remaining, 14);
        assert_eq!(game.phase, Phase::MainTurn);
    }

    #[test]
    fn test_trade_is_unchecked_by_default() {
        let mut game = two_player_game();
        game.phase = Phase::MainTurn;
        game.players[0].resources = ResourceHand::with_amounts(1, 0, 0, 0, 0);

        game.trade(
            &ResourceHand::single(Resource::Wood, 1),
            &ResourceHand::single(Resource::Ore, 3),
        )
        .unwrap();
        assert_eq!(game.players[0].resources, ResourceHand::with_amounts(0, 0, 0, 0, 3));

        assert_eq!(
            game.trade(&ResourceHand::single(Resource::Wood, 1), &ResourceHand::new()),
            Err(GameError::CannotAfford)
        );
    }

    #[test]
    fn test_trade_that_would_overflow_a_hand_is_rejected() {
        let mut game = two_player_game();
        game.phase = Phase::MainTurn;
        game.dice_roll = Some((3, 4));
        let flood = ResourceHand::single(Resource::Wood, u32::MAX);

        game.trade(&ResourceHand::new(), &flood).unwrap();
        assert_eq!(game.players[0].resources.total(), u32::MAX);

        let before = game.clone();
        assert_eq!(
            game.trade(&ResourceHand::new(), &flood),
            Err(GameError::InvalidTrade)
        );
        assert_eq!(
            game.trade(&ResourceHand::new(), &ResourceHand::single(Resource::Ore, 1)),
            Ok(vec![GameEvent::ResourcesTraded {
                player: PlayerId::from("a"),
                giving: ResourceHand::new(),
                receiving: ResourceHand::single(Resource::Ore, 1),
            }])
        );
        // wood is pinned at the maximum, so the total saturates
        assert_eq!(game.players[0].resources.total(), u32::MAX);
        assert_eq!(before.players[0].resources.wood, game.players[0].resources.wood);
    }

    #[test]
    fn test_maritime_trade_rate() {
        // No harbors = 4:1
        assert_eq!(maritime_rate(Resource::Brick, &[]), 4);

        // Generic harbor = 3:1
        assert_eq!(maritime_rate(Resource::Brick, &[Harbor::Generic]), 3);

        // Specific harbor = 2:1
        assert_eq!(
            maritime_rate(Resource::Brick, &[Harbor::Specific(Resource::Brick)]),
            2
        );
        assert_eq!(
            maritime_rate(
                Resource::Brick,
                &[Harbor::Generic, Harbor::Specific(Resource::Brick)]
            ),
            2
        );

        // Another resource's harbor does not help
        assert_eq!(
            maritime_rate(Resource::Brick, &[Harbor::Specific(Resource::Ore)]),
            4
        );
        assert_eq!(
            maritime_rate(
                Resource::Brick,
                &[Harbor::Specific(Resource::Ore), Harbor::Generic]
            ),
            3
        );
    }

    #[test]
    fn test_trade_ratio_validation() {
        let four_wood = ResourceHand::single(Resource::Wood, 4);
        let one_ore = ResourceHand::single(Resource::Ore, 1);
        assert!(validate_trade_ratio(&four_wood, &one_ore, &[]).is_ok());
        assert_eq!(
            validate_trade_ratio(&four_wood, &ResourceHand::single(Resource::Ore, 2), &[]),
            Err(GameError::InvalidTrade)
        );
        assert_eq!(
            validate_trade_ratio(&ResourceHand::single(Resource::Wood, 3), &one_ore, &[]),
            Err(GameError::InvalidTrade)
        );
        assert!(validate_trade_ratio(
            &ResourceHand::single(Resource::Wood, 3),
            &one_ore,
            &[Harbor::Generic]
        )
        .is_ok());
        assert_eq!(
            validate_trade_ratio(&ResourceHand::new(), &one_ore, &[]),
            Err(GameError::InvalidTrade)
        );
    }

    #[test]
    fn test_buy_takes_top_card() {
        let mut game = two_player_game();
        game.phase = Phase::MainTurn;
        game.players[0].resources = ResourceHand::with_amounts(0, 0, 1, 1, 1);
        let top = game.dev_deck[0];

        game.buy_development_card().unwrap();
        assert_eq!(game.players[0].dev_cards, vec![top]);
        assert_eq!(game.dev_deck.len(), 24);
        assert!(game.players[0].resources.is_empty());
    }

    #[test]
    fn test_knight_moves_to_robber_phase_and_awards_army() {
        let mut game = two_player_game();
        game.phase = Phase::MainTurn;
        game.players[0].dev_cards = vec![DevelopmentCard::Knight; 3];

        for _ in 0..3 {
            game.play_development_card(DevelopmentCard::Knight).unwrap();
            assert_eq!(game.phase, Phase::MoveRobber);
            game.phase = Phase::MainTurn;
        }
        assert_eq!(game.players[0].knights_played, 3);
        assert!(game.players[0].has_largest_army);
        assert_eq!(game.victory_points(&PlayerId::from("a")), 2);
    }

    #[test]
    fn test_other_cards_are_consumed_without_effect() {
        let mut game = two_player_game();
        game.phase = Phase::MainTurn;
        game.players[0].dev_cards = vec![DevelopmentCard::Monopoly];
        let resources = game.players[0].resources.clone();

        game.play_development_card(DevelopmentCard::Monopoly).unwrap();
        assert!(game.players[0].dev_cards.is_empty());
        assert_eq!(game.players[0].resources, resources);
        assert_eq!(game.phase, Phase::MainTurn);
        assert_eq!(
            game.play_development_card(DevelopmentCard::Monopoly),
            Err(GameError::NoSuchCard)
        );
    }

    #[test]
    fn test_move_robber_steals_from_target() {
        let mut game = two_player_game();
        game.phase = Phase::MoveRobber;
        game.players[1].resources = ResourceHand::with_amounts(0, 0, 0, 0, 2);

        let events = game.move_robber(HexId(0), Some(&PlayerId::from("b"))).unwrap();
        assert_eq!(game.board.robber_hex(), HexId(0));
        assert!(game.board.hexes()[0].has_robber);
        assert_eq!(game.players[0].resources.ore, 1);
        assert_eq!(game.players[1].resources.ore, 1);
        assert_eq!(game.phase, Phase::MainTurn);
        assert!(events.iter().any(|e| matches!(e, GameEvent::ResourceStolen { .. })));
    }

    #[test]
    fn test_move_robber_ignores_self_target() {
        let mut game = two_player_game();
        game.phase = Phase::MoveRobber;
        game.players[0].resources = ResourceHand::with_amounts(1, 0, 0, 0, 0);

        game.move_robber(HexId(3), Some(&PlayerId::from("a"))).unwrap();
        assert_eq!(game.players[0].resources.total(), 1);
    }

    #[test]
    fn test_move_robber_unknown_hex() {
        let mut game = two_player_game();
        assert_eq!(game.move_robber(HexId(19), None), Err(GameError::UnknownHex(HexId(19))));
    }

    #[test]
    fn test_end_turn_round_robin() {
        let mut game = two_player_game();
        game.phase = Phase::MainTurn;
        game.dice_roll = Some((3, 4));

        let events = game.end_turn().unwrap();
        assert_eq!(game.current_player, PlayerId::from("b"));
        assert_eq!(game.dice_roll, None);
        assert_eq!(game.turn, 2);
        assert!(events.contains(&GameEvent::AutoRollScheduled {
            player: PlayerId::from("b")
        }));

        game.end_turn().unwrap();
        assert_eq!(game.current_player, PlayerId::from("a"));
    }

    #[test]
    fn test_end_turn_during_second_setup_steps_backwards() {
        let mut game = two_player_game();
        game.phase = Phase::SetupSettlement2;
        game.current_player = PlayerId::from("b");

        game.end_turn().unwrap();
        assert_eq!(game.current_player, PlayerId::from("a"));
        assert_eq!(game.phase, Phase::SetupSettlement2);

        game.end_turn().unwrap();
        assert_eq!(game.current_player, PlayerId::from("a"));
        assert_eq!(game.phase, Phase::MainTurn);
    }

    #[test]
    fn test_award_holder_rules() {
        let mut game = two_player_game();
        game.players[0].has_longest_road = true;
        assert_eq!(award_holder(&[6, 6], MIN_LONGEST_ROAD), None);
        assert_eq!(award_holder(&[4, 2], MIN_LONGEST_ROAD), Some(None));
        assert_eq!(award_holder(&[5, 7], MIN_LONGEST_ROAD), Some(Some(1)));

        // No roads at all: the flag is cleared.
        let events = game.update_longest_road();
        assert!(!game.players[0].has_longest_road);
        assert_eq!(
            events,
            vec![GameEvent::LongestRoadChanged {
                previous: Some(PlayerId::from("a")),
                current: None
            }]
        );
    }

    #[test]
    fn test_winner_is_set_once() {
        let mut game = two_player_game();
        game.phase = Phase::MainTurn;
        game.players[1].settlements_remaining = 0;
        game.players[1].cities_remaining = 0;
        game.players[0].resources = ResourceHand::with_amounts(0, 0, 0, 0, 0);
        game.players[0].dev_cards = vec![DevelopmentCard::Monopoly];

        let events = game.play_development_card(DevelopmentCard::Monopoly).unwrap();
        assert_eq!(game.winner, Some(PlayerId::from("b")));
        assert!(events.contains(&GameEvent::GameWon {
            player: PlayerId::from("b"),
            victory_points: 13
        }));
        assert_eq!(
            game.scoreboard(),
            vec![(PlayerId::from("a"), 0), (PlayerId::from("b"), 13)]
        );

        game.players[1].cities_remaining = 4;
        game.players[0].dev_cards = vec![DevelopmentCard::Monopoly];
        let events = game.play_development_card(DevelopmentCard::Monopoly).unwrap();
        assert_eq!(game.winner, Some(PlayerId::from("b")));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::GameWon { .. })));
    }

    #[test]
    fn test_checksum_tracks_state() {
        let a = two_player_game();
        let b = two_player_game();
        assert_eq!(a.state_checksum(), b.state_checksum());

        let mut c = two_player_game();
        c.build_settlement(VertexId(0)).unwrap();
        assert_ne!(a.state_checksum(), c.state_checksum());
    }

    #[test]
    fn test_state_serde_round_trip() {
        let mut game = two_player_game();
        game.build_settlement(VertexId(5)).unwrap();
        let json = serde_json::to_string(&game).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, game);
        assert_eq!(back.state_checksum(), game.state_checksum());
    }
}
