//! Game board representation: hexes, vertices, edges, buildings and harbors.
//!
//! This module contains:
//! - Resource and terrain types
//! - The board graph (19 hexes, their deduplicated corners and sides)
//! - Building types (settlements, cities, roads)
//! - Harbor trading bonuses
//! - Board generation and query methods
//!
//! Vertices and edges are not derived from axial arithmetic. Every hex corner
//! is projected into the plane, rounded to a tenth of a unit and deduplicated;
//! edges connect any two vertices one hex side apart.

use crate::hex::{distance, HexCoord, PointKey, HEX_SIZE};
use crate::rng::GameRng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable player identifier (`player-1` for local seats, a UUID online).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

macro_rules! board_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

board_id!(
    /// Index of a hex in generation order
    HexId,
    "hex"
);
board_id!(
    /// Index of a vertex in first-seen order
    VertexId,
    "vertex"
);
board_id!(
    /// Index of an edge in generation order
    EdgeId,
    "edge"
);

/// Resource types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Wood,
    Brick,
    Sheep,
    Wheat,
    Ore,
}

impl Resource {
    /// All resource types, in canonical order
    pub const ALL: [Resource; 5] = [
        Resource::Wood,
        Resource::Brick,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Ore,
    ];
}

/// Terrain of a hex tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Wood,
    Brick,
    Sheep,
    Wheat,
    Ore,
    /// No production, starts with the robber
    Desert,
}

impl Terrain {
    /// The resource this terrain produces, if any
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Terrain::Wood => Some(Resource::Wood),
            Terrain::Brick => Some(Resource::Brick),
            Terrain::Sheep => Some(Resource::Sheep),
            Terrain::Wheat => Some(Resource::Wheat),
            Terrain::Ore => Some(Resource::Ore),
            Terrain::Desert => None,
        }
    }
}

/// Harbor types for maritime trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Harbor {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl Harbor {
    /// The exchange rate for this harbor
    pub fn rate(&self) -> u32 {
        match self {
            Harbor::Generic => 3,
            Harbor::Specific(_) => 2,
        }
    }
}

/// Settlement or city
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingKind {
    Settlement,
    City,
}

/// What's built on a vertex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub kind: BuildingKind,
    pub owner: PlayerId,
}

impl Building {
    /// Resource multiplier (how many resources per production)
    pub fn resource_multiplier(&self) -> u32 {
        match self.kind {
            BuildingKind::Settlement => 1,
            BuildingKind::City => 2,
        }
    }
}

/// What's built on an edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    pub owner: PlayerId,
}

/// A single hex tile on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hex {
    pub id: HexId,
    pub coord: HexCoord,
    pub terrain: Terrain,
    /// Dice number that triggers production (None for the desert)
    pub number: Option<u8>,
    /// Whether the robber is currently on this tile
    pub has_robber: bool,
    /// Planar centre
    pub x: f64,
    pub y: f64,
    /// The six corners, clockwise from the top
    pub vertices: Vec<VertexId>,
}

/// A building site where up to three hexes meet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub x: f64,
    pub y: f64,
    /// Hexes sharing this corner (1 to 3)
    pub hexes: Vec<HexId>,
    /// Incident edges (2 or 3)
    pub edges: Vec<EdgeId>,
    pub building: Option<Building>,
    pub harbor: Option<Harbor>,
}

/// A road site between two adjacent vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Endpoints, lower id first
    pub vertices: (VertexId, VertexId),
    pub road: Option<Road>,
}

impl Edge {
    /// The endpoint opposite `from`
    pub fn other_end(&self, from: VertexId) -> VertexId {
        if self.vertices.0 == from {
            self.vertices.1
        } else {
            self.vertices.0
        }
    }
}

/// Harbor placement on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarborPlacement {
    /// The coastal edge where ships dock
    pub edge: EdgeId,
    pub harbor: Harbor,
}

/// Axial positions of the 19 land hexes, in generation order (3-4-5-4-3 rows).
pub const HEX_POSITIONS: [(i32, i32); 19] = [
    (0, -2),
    (1, -2),
    (2, -2),
    (-1, -1),
    (0, -1),
    (1, -1),
    (2, -1),
    (-2, 0),
    (-1, 0),
    (0, 0),
    (1, 0),
    (2, 0),
    (-2, 1),
    (-1, 1),
    (0, 1),
    (1, 1),
    (-2, 2),
    (-1, 2),
    (0, 2),
];

/// Number tokens for the 18 producing hexes.
pub const NUMBER_TOKENS: [u8; 18] = [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

/// The complete game board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    hexes: Vec<Hex>,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    harbors: Vec<HarborPlacement>,
    robber_hex: HexId,
}

impl Board {
    /// Generate the standard board: fixed 19-hex shape, shuffled terrain and
    /// numbers, deduplicated corners, side-length edges and 9 harbors.
    ///
    /// Pure function of the RNG state.
    pub fn generate(rng: &mut GameRng) -> Self {
        let mut terrains = Self::terrain_pool();
        rng.shuffle(&mut terrains);

        let mut numbers = NUMBER_TOKENS.to_vec();
        rng.shuffle(&mut numbers);
        let mut numbers = numbers.into_iter();

        let mut hexes = Vec::with_capacity(HEX_POSITIONS.len());
        let mut robber_hex = HexId(0);
        for (index, (&(q, r), terrain)) in HEX_POSITIONS.iter().zip(terrains).enumerate() {
            let coord = HexCoord::new(q, r);
            let (x, y) = coord.to_pixel(HEX_SIZE);
            let is_desert = terrain == Terrain::Desert;
            if is_desert {
                robber_hex = HexId(index);
            }
            hexes.push(Hex {
                id: HexId(index),
                coord,
                terrain,
                number: if is_desert { None } else { numbers.next() },
                has_robber: is_desert,
                x,
                y,
                vertices: Vec::with_capacity(6),
            });
        }

        let vertices = Self::generate_vertices(&mut hexes);
        let mut board = Self {
            hexes,
            vertices,
            edges: Vec::new(),
            harbors: Vec::new(),
            robber_hex,
        };
        board.generate_edges(HEX_SIZE);
        board.place_harbors(rng);
        board
    }

    fn terrain_pool() -> Vec<Terrain> {
        let mut pool = Vec::with_capacity(19);
        pool.extend(std::iter::repeat(Terrain::Wood).take(4));
        pool.extend(std::iter::repeat(Terrain::Brick).take(3));
        pool.extend(std::iter::repeat(Terrain::Sheep).take(4));
        pool.extend(std::iter::repeat(Terrain::Wheat).take(4));
        pool.extend(std::iter::repeat(Terrain::Ore).take(3));
        pool.push(Terrain::Desert);
        pool
    }

    /// Project every corner and merge the ones that round to the same point.
    fn generate_vertices(hexes: &mut [Hex]) -> Vec<Vertex> {
        let mut vertices: Vec<Vertex> = Vec::new();
        let mut seen: FxHashMap<PointKey, VertexId> = FxHashMap::default();

        for hex in hexes.iter_mut() {
            for (x, y) in hex.coord.corners(HEX_SIZE) {
                let key = PointKey::new(x, y);
                let id = *seen.entry(key).or_insert_with(|| {
                    let id = VertexId(vertices.len());
                    let (x, y) = key.point();
                    vertices.push(Vertex {
                        id,
                        x,
                        y,
                        hexes: Vec::new(),
                        edges: Vec::new(),
                        building: None,
                        harbor: None,
                    });
                    id
                });

                let vertex = &mut vertices[id.0];
                if !vertex.hexes.contains(&hex.id) {
                    vertex.hexes.push(hex.id);
                }
                hex.vertices.push(id);
            }
        }

        vertices
    }

    /// Connect every vertex pair whose distance lies in the side-length band.
    fn generate_edges(&mut self, hex_size: f64) {
        let (min, max) = (hex_size * 0.875, hex_size * 1.125);
        for i in 0..self.vertices.len() {
            for j in (i + 1)..self.vertices.len() {
                let a = &self.vertices[i];
                let b = &self.vertices[j];
                let d = distance((a.x, a.y), (b.x, b.y));
                if d > min && d < max {
                    let id = EdgeId(self.edges.len());
                    self.edges.push(Edge {
                        id,
                        vertices: (a.id, b.id),
                        road: None,
                    });
                    self.vertices[i].edges.push(id);
                    self.vertices[j].edges.push(id);
                }
            }
        }
    }

    /// Edges on the outer coast: their endpoints share exactly one hex.
    pub fn coastal_edges(&self) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| {
                let a = &self.vertices[e.vertices.0 .0];
                let b = &self.vertices[e.vertices.1 .0];
                a.hexes.iter().filter(|h| b.hexes.contains(h)).count() == 1
            })
            .map(|e| e.id)
            .collect()
    }

    /// Standard harbors: 4 generic (3:1) and 5 specific (2:1, one per resource),
    /// spread around the coast.
    fn place_harbors(&mut self, rng: &mut GameRng) {
        let mut harbor_types = vec![Harbor::Generic; 4];
        harbor_types.extend(Resource::ALL.into_iter().map(Harbor::Specific));
        rng.shuffle(&mut harbor_types);

        let selected = self.select_distributed_coastal_edges(harbor_types.len(), rng);

        for (edge, harbor) in selected.into_iter().zip(harbor_types) {
            let (a, b) = self.edges[edge.0].vertices;
            self.vertices[a.0].harbor = Some(harbor);
            self.vertices[b.0].harbor = Some(harbor);
            self.harbors.push(HarborPlacement { edge, harbor });
        }
    }

    /// Greedy max-min selection: each pick is the coastal edge farthest from
    /// every edge already chosen.
    fn select_distributed_coastal_edges(&self, count: usize, rng: &mut GameRng) -> Vec<EdgeId> {
        let mut available = self.coastal_edges();
        if available.len() <= count {
            return available;
        }
        rng.shuffle(&mut available);

        let mut selected: Vec<EdgeId> = vec![available.remove(0)];
        while selected.len() < count && !available.is_empty() {
            let mut best: Option<(usize, f64)> = None;
            for (idx, candidate) in available.iter().enumerate() {
                let min_dist = selected
                    .iter()
                    .map(|s| distance(self.edge_midpoint(*candidate), self.edge_midpoint(*s)))
                    .fold(f64::MAX, f64::min);
                if best.map_or(true, |(_, d)| min_dist > d) {
                    best = Some((idx, min_dist));
                }
            }
            match best {
                Some((idx, _)) => selected.push(available.remove(idx)),
                None => break,
            }
        }
        selected
    }

    fn edge_midpoint(&self, edge: EdgeId) -> (f64, f64) {
        let (a, b) = self.edges[edge.0].vertices;
        let (a, b) = (&self.vertices[a.0], &self.vertices[b.0]);
        ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }

    // ==================== Query Methods ====================

    pub fn hexes(&self) -> &[Hex] {
        &self.hexes
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn harbors(&self) -> &[HarborPlacement] {
        &self.harbors
    }

    pub fn hex(&self, id: HexId) -> Option<&Hex> {
        self.hexes.get(id.0)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.0)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0)
    }

    /// Get the robber's current location
    pub fn robber_hex(&self) -> HexId {
        self.robber_hex
    }

    /// Owner of the building at a vertex, if any
    pub fn building_owner(&self, id: VertexId) -> Option<&PlayerId> {
        self.vertex(id)
            .and_then(|v| v.building.as_ref())
            .map(|b| &b.owner)
    }

    fn road_owner(&self, id: EdgeId) -> Option<&PlayerId> {
        self.edge(id).and_then(|e| e.road.as_ref()).map(|r| &r.owner)
    }

    /// Resources granted by the second setup settlement: one per adjacent
    /// producing hex.
    pub fn starting_resources(&self, vertex: VertexId) -> Vec<Resource> {
        self.vertex(vertex)
            .map(|v| {
                v.hexes
                    .iter()
                    .filter_map(|h| self.hexes[h.0].terrain.resource())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get all harbors a player has access to (through their buildings)
    pub fn player_harbors(&self, player: &PlayerId) -> Vec<Harbor> {
        self.harbors
            .iter()
            .filter(|placement| {
                let (a, b) = self.edges[placement.edge.0].vertices;
                self.building_owner(a) == Some(player) || self.building_owner(b) == Some(player)
            })
            .map(|placement| placement.harbor)
            .collect()
    }

    /// Players with a building on a corner of the hex, in first-seen order
    pub fn players_adjacent_to_hex(&self, hex: HexId) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = Vec::new();
        if let Some(hex) = self.hex(hex) {
            for vertex in &hex.vertices {
                if let Some(owner) = self.building_owner(*vertex) {
                    if !players.contains(owner) {
                        players.push(owner.clone());
                    }
                }
            }
        }
        players
    }

    // ==================== Validation Methods ====================

    /// Check if an edge connects to a player's network: an own building at an
    /// endpoint, or an own road meeting it at an endpoint not held by an
    /// opponent.
    pub fn is_connected_to_network(&self, edge: EdgeId, player: &PlayerId) -> bool {
        let Some(e) = self.edge(edge) else {
            return false;
        };
        for endpoint in [e.vertices.0, e.vertices.1] {
            let endpoint_owner = self.building_owner(endpoint);
            if endpoint_owner == Some(player) {
                return true;
            }
            if endpoint_owner.is_none() {
                let touching = &self.vertices[endpoint.0].edges;
                if touching
                    .iter()
                    .any(|adj| *adj != edge && self.road_owner(*adj) == Some(player))
                {
                    return true;
                }
            }
        }
        false
    }

    // ==================== Mutation Methods ====================

    /// Place a settlement (assumes validation already done)
    pub fn place_settlement(&mut self, vertex: VertexId, player: PlayerId) {
        if let Some(v) = self.vertices.get_mut(vertex.0) {
            v.building = Some(Building {
                kind: BuildingKind::Settlement,
                owner: player,
            });
        }
    }

    /// Upgrade a settlement to a city in place
    pub fn upgrade_to_city(&mut self, vertex: VertexId) {
        if let Some(building) = self.vertices.get_mut(vertex.0).and_then(|v| v.building.as_mut()) {
            building.kind = BuildingKind::City;
        }
    }

    /// Place a road
    pub fn place_road(&mut self, edge: EdgeId, player: PlayerId) {
        if let Some(e) = self.edges.get_mut(edge.0) {
            e.road = Some(Road { owner: player });
        }
    }

    /// Move the robber to a new location
    pub fn move_robber(&mut self, hex: HexId) {
        if hex.0 >= self.hexes.len() {
            return;
        }
        if let Some(old) = self.hexes.get_mut(self.robber_hex.0) {
            old.has_robber = false;
        }
        self.hexes[hex.0].has_robber = true;
        self.robber_hex = hex;
    }

    // ==================== Resource Distribution ====================

    /// Production for a dice roll as `(owner, resource, amount)` grants, in
    /// hex then corner order. Robber and desert hexes produce nothing.
    pub fn resources_for_roll(&self, roll: u8) -> Vec<(PlayerId, Resource, u32)> {
        let mut grants = Vec::new();

        for hex in &self.hexes {
            if hex.number != Some(roll) || hex.has_robber {
                continue;
            }
            let Some(resource) = hex.terrain.resource() else {
                continue;
            };

            for vertex in &hex.vertices {
                if let Some(building) = &self.vertices[vertex.0].building {
                    grants.push((building.owner.clone(), resource, building.resource_multiplier()));
                }
            }
        }

        grants
    }

    // ==================== Longest Road Calculation ====================

    /// Number of roads a player owns
    pub fn road_count(&self, player: &PlayerId) -> u32 {
        self.edges
            .iter()
            .filter(|e| e.road.as_ref().is_some_and(|r| &r.owner == player))
            .count() as u32
    }

    /// Length of the longest simple path through a player's roads.
    ///
    /// A path may end at, but not pass through, a vertex holding an
    /// opponent's building.
    pub fn longest_road(&self, player: &PlayerId) -> u32 {
        let mut visited = vec![false; self.edges.len()];
        let mut max_length = 0;

        for vertex in &self.vertices {
            let touches_own_road = vertex
                .edges
                .iter()
                .any(|e| self.road_owner(*e) == Some(player));
            if touches_own_road {
                max_length = max_length.max(self.dfs_road_length(player, vertex.id, &mut visited));
            }
        }

        max_length
    }

    /// DFS from a vertex along unvisited own roads
    fn dfs_road_length(&self, player: &PlayerId, from: VertexId, visited: &mut [bool]) -> u32 {
        let mut best = 0;

        for &edge in &self.vertices[from.0].edges {
            if visited[edge.0] || self.road_owner(edge) != Some(player) {
                continue;
            }
            visited[edge.0] = true;

            let next = self.edges[edge.0].other_end(from);
            let blocked = self
                .building_owner(next)
                .is_some_and(|owner| owner != player);
            let continuation = if blocked {
                0
            } else {
                self.dfs_road_length(player, next, visited)
            };

            visited[edge.0] = false;
            best = best.max(1 + continuation);
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(seed: u64) -> Board {
        Board::generate(&mut GameRng::new(seed))
    }

    fn p(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    /// Edges forming a simple chain starting at `start`, following the lowest
    /// unvisited edge id each step.
    fn chain(board: &Board, start: VertexId, len: usize) -> Vec<EdgeId> {
        let mut path = Vec::new();
        let mut at = start;
        while path.len() < len {
            let next = board.vertices()[at.0]
                .edges
                .iter()
                .copied()
                .find(|e| {
                    let other = board.edges()[e.0].other_end(at);
                    !path.contains(e)
                        && !path.iter().any(|p: &EdgeId| {
                            let (a, b) = board.edges()[p.0].vertices;
                            a == other || b == other
                        })
                })
                .expect("board is large enough for a simple chain");
            at = board.edges()[next.0].other_end(at);
            path.push(next);
        }
        path
    }

    #[test]
    fn test_board_has_19_hexes_in_fixed_positions() {
        let board = board(1);
        assert_eq!(board.hexes().len(), 19);
        for (hex, &(q, r)) in board.hexes().iter().zip(HEX_POSITIONS.iter()) {
            assert_eq!(hex.coord, HexCoord::new(q, r));
        }
    }

    #[test]
    fn test_single_desert_without_number_holds_robber() {
        let board = board(2);
        let deserts: Vec<&Hex> = board
            .hexes()
            .iter()
            .filter(|h| h.terrain == Terrain::Desert)
            .collect();
        assert_eq!(deserts.len(), 1);
        assert_eq!(deserts[0].number, None);
        assert!(deserts[0].has_robber);
        assert_eq!(board.robber_hex(), deserts[0].id);
        assert_eq!(board.hexes().iter().filter(|h| h.has_robber).count(), 1);
    }

    #[test]
    fn test_numbers_use_standard_tokens() {
        let board = board(3);
        let mut numbers: Vec<u8> = board.hexes().iter().filter_map(|h| h.number).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, NUMBER_TOKENS.to_vec());
    }

    #[test]
    fn test_terrain_distribution() {
        let board = board(4);
        let count = |t| board.hexes().iter().filter(|h| h.terrain == t).count();
        assert_eq!(count(Terrain::Wood), 4);
        assert_eq!(count(Terrain::Brick), 3);
        assert_eq!(count(Terrain::Sheep), 4);
        assert_eq!(count(Terrain::Wheat), 4);
        assert_eq!(count(Terrain::Ore), 3);
    }

    #[test]
    fn test_vertex_and_edge_counts() {
        let board = board(5);
        assert_eq!(board.vertices().len(), 54);
        assert_eq!(board.edges().len(), 72);
        for vertex in board.vertices() {
            assert!((1..=3).contains(&vertex.hexes.len()));
            assert!((2..=3).contains(&vertex.edges.len()));
        }
        for hex in board.hexes() {
            assert_eq!(hex.vertices.len(), 6);
        }
    }

    #[test]
    fn test_edges_span_one_side_length() {
        let board = board(6);
        for edge in board.edges() {
            let a = &board.vertices()[edge.vertices.0 .0];
            let b = &board.vertices()[edge.vertices.1 .0];
            let d = distance((a.x, a.y), (b.x, b.y));
            assert!(d > 35.0 && d < 45.0, "edge {} has length {}", edge.id, d);
            assert!(edge.vertices.0 < edge.vertices.1);
        }
    }

    #[test]
    fn test_coastal_edges_ring_the_board() {
        assert_eq!(board(7).coastal_edges().len(), 30);
    }

    #[test]
    fn test_nine_harbors_on_coast() {
        let board = board(8);
        assert_eq!(board.harbors().len(), 9);

        let coastal = board.coastal_edges();
        let generic = board
            .harbors()
            .iter()
            .filter(|h| h.harbor == Harbor::Generic)
            .count();
        assert_eq!(generic, 4);

        for placement in board.harbors() {
            assert!(coastal.contains(&placement.edge));
            let (a, b) = board.edges()[placement.edge.0].vertices;
            assert!(board.vertices()[a.0].harbor.is_some());
            assert!(board.vertices()[b.0].harbor.is_some());
        }
    }

    #[test]
    fn test_same_seed_same_board() {
        assert_eq!(board(42), board(42));
    }

    #[test]
    fn test_different_seeds_differ() {
        let boards: Vec<Board> = (0..5).map(board).collect();
        assert!(boards.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_resource_distribution() {
        let mut board = board(9);
        let hex = board
            .hexes()
            .iter()
            .find(|h| h.number.is_some())
            .cloned()
            .expect("producing hex");
        let vertex = hex.vertices[0];
        board.place_settlement(vertex, p("a"));

        let roll = hex.number.expect("number");
        let grants = board.resources_for_roll(roll);
        let resource = hex.terrain.resource().expect("resource");
        assert!(grants.contains(&(p("a"), resource, 1)));
    }

    #[test]
    fn test_city_gives_double_resources() {
        let mut board = board(9);
        let hex = board
            .hexes()
            .iter()
            .find(|h| h.number.is_some())
            .cloned()
            .expect("producing hex");
        board.place_settlement(hex.vertices[0], p("a"));
        board.upgrade_to_city(hex.vertices[0]);

        let grants = board.resources_for_roll(hex.number.expect("number"));
        assert!(grants
            .iter()
            .any(|(owner, _, amount)| owner == &p("a") && *amount == 2));
    }

    #[test]
    fn test_robber_blocks_production() {
        let mut board = board(10);
        let hex = board
            .hexes()
            .iter()
            .find(|h| h.number.is_some())
            .cloned()
            .expect("producing hex");
        board.place_settlement(hex.vertices[0], p("a"));

        let roll = hex.number.expect("number");
        let before = board.resources_for_roll(roll).len();
        board.move_robber(hex.id);
        let after = board.resources_for_roll(roll).len();

        assert_eq!(after, before - 1);
        assert_eq!(board.robber_hex(), hex.id);
        assert_eq!(board.hexes().iter().filter(|h| h.has_robber).count(), 1);
    }

    #[test]
    fn test_road_connectivity() {
        let mut board = board(11);
        let start = VertexId(0);
        let roads = chain(&board, start, 2);

        assert!(!board.is_connected_to_network(roads[0], &p("a")));
        board.place_settlement(start, p("a"));
        assert!(board.is_connected_to_network(roads[0], &p("a")));

        board.place_road(roads[0], p("a"));
        assert!(board.is_connected_to_network(roads[1], &p("a")));
        assert!(!board.is_connected_to_network(roads[1], &p("b")));
    }

    #[test]
    fn test_opponent_building_breaks_connectivity() {
        let mut board = board(12);
        let roads = chain(&board, VertexId(0), 2);
        board.place_road(roads[0], p("a"));

        let (a, b) = board.edges()[roads[0].0].vertices;
        let (c, d) = board.edges()[roads[1].0].vertices;
        let junction = if a == c || a == d { a } else { b };
        board.place_settlement(junction, p("b"));

        let far_end_of_second = board.edges()[roads[1].0].other_end(junction);
        assert!(board.building_owner(far_end_of_second).is_none());
        assert!(!board.is_connected_to_network(roads[1], &p("a")));
    }

    #[test]
    fn test_longest_road_chain() {
        let mut board = board(13);
        for edge in chain(&board, VertexId(0), 5) {
            board.place_road(edge, p("a"));
        }
        assert_eq!(board.road_count(&p("a")), 5);
        assert_eq!(board.longest_road(&p("a")), 5);
    }

    #[test]
    fn test_longest_road_fork_counts_one_branch() {
        let mut board = board(14);
        // Find a vertex with three edges and build all three: a "Y" of length 2.
        let hub = board
            .vertices()
            .iter()
            .find(|v| v.edges.len() == 3)
            .map(|v| v.id)
            .expect("interior vertex");
        for edge in board.vertices()[hub.0].edges.clone() {
            board.place_road(edge, p("a"));
        }
        assert_eq!(board.road_count(&p("a")), 3);
        assert_eq!(board.longest_road(&p("a")), 2);
    }

    #[test]
    fn test_longest_road_blocked_by_opponent() {
        let mut board = board(15);
        let roads = chain(&board, VertexId(0), 4);
        for edge in &roads {
            board.place_road(*edge, p("a"));
        }
        let (a, b) = board.edges()[roads[1].0].vertices;
        let (c, d) = board.edges()[roads[2].0].vertices;
        let junction = if a == c || a == d { a } else { b };
        board.place_settlement(junction, p("b"));
        assert_eq!(board.longest_road(&p("a")), 2);
    }

    #[test]
    fn test_harbor_access() {
        let mut board = board(16);
        let placement = board.harbors()[0].clone();
        let (a, _) = board.edges()[placement.edge.0].vertices;
        assert!(board.player_harbors(&p("a")).is_empty());
        board.place_settlement(a, p("a"));
        assert_eq!(board.player_harbors(&p("a")), vec![placement.harbor]);
    }

    #[test]
    fn test_players_adjacent_to_hex() {
        let mut board = board(17);
        let hex = board.hexes()[9].clone();
        board.place_settlement(hex.vertices[0], p("a"));
        board.place_settlement(hex.vertices[3], p("b"));
        assert_eq!(board.players_adjacent_to_hex(hex.id), vec![p("a"), p("b")]);
    }

    #[test]
    fn test_starting_resources_skip_desert() {
        let board = board(18);
        let desert = board
            .hexes()
            .iter()
            .find(|h| h.terrain == Terrain::Desert)
            .expect("desert");
        let corner = desert.vertices[0];
        let expected = board.vertices()[corner.0].hexes.len() - 1;
        assert_eq!(board.starting_resources(corner).len(), expected);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(VertexId(12).to_string(), "vertex-12");
        assert_eq!(EdgeId(3).to_string(), "edge-3");
    }
}
