//! Player state and resource management.
//!
//! This module contains:
//! - Player struct with resources, piece counters, development cards and awards
//! - ResourceHand for managing resource counts
//! - Development card types and the standard deck
//! - Building costs

use crate::board::{PlayerId, Resource};
use crate::rng::GameRng;
use serde::{Deserialize, Serialize};

/// Settlement pieces each player starts with.
pub const MAX_SETTLEMENTS: u32 = 5;
/// City pieces each player starts with.
pub const MAX_CITIES: u32 = 4;
/// Road pieces each player starts with.
pub const MAX_ROADS: u32 = 15;

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DevelopmentCard {
    /// Move robber and steal, counts toward Largest Army
    Knight,
    /// Worth 1 VP while held
    VictoryPoint,
    /// Build 2 roads for free
    RoadBuilding,
    /// Take any 2 resources from the bank
    YearOfPlenty,
    /// All players must give you all of one resource type
    Monopoly,
}

impl DevelopmentCard {
    /// Create the standard development card deck (25 cards), unshuffled
    pub fn standard_deck() -> Vec<DevelopmentCard> {
        let mut deck = Vec::with_capacity(25);

        // 14 Knights
        deck.extend(std::iter::repeat(DevelopmentCard::Knight).take(14));

        // 5 Victory Points
        deck.extend(std::iter::repeat(DevelopmentCard::VictoryPoint).take(5));

        // 2 Road Building
        deck.extend(std::iter::repeat(DevelopmentCard::RoadBuilding).take(2));

        // 2 Year of Plenty
        deck.extend(std::iter::repeat(DevelopmentCard::YearOfPlenty).take(2));

        // 2 Monopoly
        deck.extend(std::iter::repeat(DevelopmentCard::Monopoly).take(2));

        deck
    }
}

/// A hand of resources.
///
/// Missing fields deserialize as zero, so partial maps such as
/// `{"wood": 2}` are accepted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceHand {
    pub wood: u32,
    pub brick: u32,
    pub sheep: u32,
    pub wheat: u32,
    pub ore: u32,
}

impl ResourceHand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand with specific amounts
    pub fn with_amounts(wood: u32, brick: u32, sheep: u32, wheat: u32, ore: u32) -> Self {
        Self {
            wood,
            brick,
            sheep,
            wheat,
            ore,
        }
    }

    /// Create a hand with a single resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    /// Total number of resource cards
    pub fn total(&self) -> u32 {
        Resource::ALL
            .iter()
            .fold(0u32, |sum, &r| sum.saturating_add(self.get(r)))
    }

    /// Check if hand is empty
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Wood => self.wood,
            Resource::Brick => self.brick,
            Resource::Sheep => self.sheep,
            Resource::Wheat => self.wheat,
            Resource::Ore => self.ore,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Wood => &mut self.wood,
            Resource::Brick => &mut self.brick,
            Resource::Sheep => &mut self.sheep,
            Resource::Wheat => &mut self.wheat,
            Resource::Ore => &mut self.ore,
        }
    }

    /// Add resources to hand, saturating at `u32::MAX`
    pub fn add(&mut self, resource: Resource, amount: u32) {
        let slot = self.slot(resource);
        *slot = slot.saturating_add(amount);
    }

    /// Add another hand to this one
    pub fn add_hand(&mut self, other: &ResourceHand) {
        for resource in Resource::ALL {
            self.add(resource, other.get(resource));
        }
    }

    /// Sum of both hands, or `None` if any count would overflow
    pub fn checked_add_hand(&self, other: &ResourceHand) -> Option<ResourceHand> {
        let mut sum = self.clone();
        for resource in Resource::ALL {
            let slot = sum.slot(resource);
            *slot = slot.checked_add(other.get(resource))?;
        }
        Some(sum)
    }

    /// Check if can afford a cost
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL
            .iter()
            .all(|&r| self.get(r) >= cost.get(r))
    }

    /// Try to subtract, returning false (and leaving the hand untouched) if insufficient
    pub fn try_subtract(&mut self, cost: &ResourceHand) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for resource in Resource::ALL {
            *self.slot(resource) -= cost.get(resource);
        }
        true
    }

    /// Resource types this hand holds at least one of, in canonical order
    pub fn held_types(&self) -> Vec<Resource> {
        Resource::ALL
            .into_iter()
            .filter(|&r| self.get(r) > 0)
            .collect()
    }

    /// Remove one card of a uniformly chosen held resource type (robber steal).
    ///
    /// The draw is over resource *types*, not individual cards.
    pub fn take_random_type(&mut self, rng: &mut GameRng) -> Option<Resource> {
        let held = self.held_types();
        let resource = *rng.choose(&held)?;
        *self.slot(resource) -= 1;
        Some(resource)
    }

    /// Discard `count` cards one at a time, each from a uniformly chosen held
    /// type. Returns what was discarded.
    pub fn discard_random(&mut self, count: u32, rng: &mut GameRng) -> ResourceHand {
        let mut discarded = ResourceHand::new();
        for _ in 0..count {
            match self.take_random_type(rng) {
                Some(resource) => discarded.add(resource, 1),
                None => break,
            }
        }
        discarded
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// Cost to build a road: 1 wood, 1 brick
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 0)
    }

    /// Cost to build a settlement: 1 wood, 1 brick, 1 sheep, 1 wheat
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 1, 1, 0)
    }

    /// Cost to upgrade to city: 2 wheat, 3 ore
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 0, 2, 3)
    }

    /// Cost to buy a development card: 1 sheep, 1 wheat, 1 ore
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 1)
    }
}

/// Seat configuration supplied when a game is initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Stable id; generated as `player-N` when absent (local games)
    #[serde(default)]
    pub id: Option<PlayerId>,
    pub name: String,
    pub color: String,
}

impl PlayerConfig {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: color.into(),
        }
    }

    pub fn with_id(id: impl Into<PlayerId>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            color: color.into(),
        }
    }

    /// Four hotseat players used when a game is initialized without configs
    pub fn default_seats() -> Vec<PlayerConfig> {
        vec![
            PlayerConfig::new("Player 1", "#ff4444"),
            PlayerConfig::new("Player 2", "#4444ff"),
            PlayerConfig::new("Player 3", "#44ff44"),
            PlayerConfig::new("Player 4", "#ffaa00"),
        ]
    }
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Display color, e.g. `#ff4444`
    pub color: String,
    /// Current resources
    pub resources: ResourceHand,
    /// Development cards in hand (multiset, in purchase order)
    pub dev_cards: Vec<DevelopmentCard>,
    /// Number of knights played (for Largest Army)
    pub knights_played: u32,
    /// Whether this player has the Longest Road card
    pub has_longest_road: bool,
    /// Whether this player has the Largest Army card
    pub has_largest_army: bool,
    /// Number of settlements remaining to build
    pub settlements_remaining: u32,
    /// Number of cities remaining to build
    pub cities_remaining: u32,
    /// Number of roads remaining to build
    pub roads_remaining: u32,
}

impl Player {
    /// Create a new player with an empty hand and a full set of pieces
    pub fn new(id: PlayerId, name: String, color: String) -> Self {
        Self {
            id,
            name,
            color,
            resources: ResourceHand::new(),
            dev_cards: Vec::new(),
            knights_played: 0,
            has_longest_road: false,
            has_largest_army: false,
            settlements_remaining: MAX_SETTLEMENTS,
            cities_remaining: MAX_CITIES,
            roads_remaining: MAX_ROADS,
        }
    }

    /// Victory points, recomputed from piece counters, awards and held cards.
    ///
    /// A city upgrade hands its settlement piece back, so the settlement term
    /// only counts settlements still standing.
    pub fn victory_points(&self) -> u32 {
        let mut vp = MAX_SETTLEMENTS.saturating_sub(self.settlements_remaining);
        vp += 2 * MAX_CITIES.saturating_sub(self.cities_remaining);

        if self.has_longest_road {
            vp += 2;
        }
        if self.has_largest_army {
            vp += 2;
        }

        vp + self.card_count(DevelopmentCard::VictoryPoint)
    }

    /// How many copies of a development card this player holds
    pub fn card_count(&self, card: DevelopmentCard) -> u32 {
        self.dev_cards.iter().filter(|c| **c == card).count() as u32
    }

    /// Remove one copy of a card from hand; false if not held
    pub fn remove_dev_card(&mut self, card: DevelopmentCard) -> bool {
        if let Some(pos) = self.dev_cards.iter().position(|c| *c == card) {
            self.dev_cards.remove(pos);
            true
        } else {
            false
        }
    }
}
