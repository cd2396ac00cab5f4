//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cell coordinate on the island, 0-based `(row, col)` from the top-left corner.
///
/// Serialized as a two-element `[row, col]` array so that population records
/// read the same way they are written by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn add(&self, d_row: i32, d_col: i32) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }

    /// The coordinate one step away in `direction`. May lie off the grid.
    pub fn step(&self, direction: Direction) -> Self {
        let (d_row, d_col) = direction.to_delta();
        self.add(d_row, d_col)
    }

    /// Manhattan distance to another position
    pub fn manhattan_distance(&self, other: &Position) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }
}

impl From<(i32, i32)> for Position {
    fn from((row, col): (i32, i32)) -> Self {
        Self::new(row, col)
    }
}

impl From<Position> for (i32, i32) {
    fn from(pos: Position) -> Self {
        (pos.row, pos.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Migration direction. Only edge-sharing neighbours are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// `(d_row, d_col)` for one step in this direction.
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }

    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }
}

/// Terrain type of a cell, fixed for the lifetime of the island.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Terrain {
    Lowland,
    Highland,
    Desert,
    Water,
}

impl Terrain {
    /// Parse a map symbol (`L`, `H`, `D`, `W`).
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'L' => Some(Terrain::Lowland),
            'H' => Some(Terrain::Highland),
            'D' => Some(Terrain::Desert),
            'W' => Some(Terrain::Water),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Terrain::Lowland => 'L',
            Terrain::Highland => 'H',
            Terrain::Desert => 'D',
            Terrain::Water => 'W',
        }
    }

    /// Animals may live in (and migrate into) every terrain except water.
    pub fn is_habitable(&self) -> bool {
        !matches!(self, Terrain::Water)
    }

    /// Whether this terrain grows fodder at all.
    pub fn grows_fodder(&self) -> bool {
        matches!(self, Terrain::Lowland | Terrain::Highland)
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Terrain::Lowland => "Lowland",
            Terrain::Highland => "Highland",
            Terrain::Desert => "Desert",
            Terrain::Water => "Water",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Herbivore,
    Carnivore,
}

impl Species {
    pub fn all() -> [Species; 2] {
        [Species::Herbivore, Species::Carnivore]
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Herbivore => f.write_str("Herbivore"),
            Species::Carnivore => f.write_str("Carnivore"),
        }
    }
}

/// One animal in a population record.
///
/// `age` is signed so that a negative age can be reported as a validation
/// failure instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalSpec {
    pub species: Species,
    pub age: i64,
    pub weight: f64,
}

impl AnimalSpec {
    pub fn new(species: Species, age: i64, weight: f64) -> Self {
        Self {
            species,
            age,
            weight,
        }
    }

    pub fn herbivore(age: i64, weight: f64) -> Self {
        Self::new(Species::Herbivore, age, weight)
    }

    pub fn carnivore(age: i64, weight: f64) -> Self {
        Self::new(Species::Carnivore, age, weight)
    }
}

/// A batch of animals to place in one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationEntry {
    pub location: Position,
    pub population: Vec<AnimalSpec>,
}

impl PopulationEntry {
    pub fn new(location: Position, population: Vec<AnimalSpec>) -> Self {
        Self {
            location,
            population,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_step() {
        let pos = Position::new(2, 3);
        assert_eq!(pos.step(Direction::North), Position::new(1, 3));
        assert_eq!(pos.step(Direction::East), Position::new(2, 4));
        assert_eq!(pos.step(Direction::South), Position::new(3, 3));
        assert_eq!(pos.step(Direction::West), Position::new(2, 2));
    }

    #[test]
    fn test_manhattan_distance() {
        let pos1 = Position::new(0, 0);
        let pos2 = Position::new(3, 4);
        assert_eq!(pos1.manhattan_distance(&pos2), 7);
    }

    #[test]
    fn test_direction_delta() {
        assert_eq!(Direction::North.to_delta(), (-1, 0));
        assert_eq!(Direction::South.to_delta(), (1, 0));
        assert_eq!(Direction::East.to_delta(), (0, 1));
        assert_eq!(Direction::West.to_delta(), (0, -1));
    }

    #[test]
    fn test_terrain_symbols() {
        for terrain in [
            Terrain::Lowland,
            Terrain::Highland,
            Terrain::Desert,
            Terrain::Water,
        ] {
            assert_eq!(Terrain::from_symbol(terrain.symbol()), Some(terrain));
        }
        assert_eq!(Terrain::from_symbol('R'), None);
        assert!(!Terrain::Water.is_habitable());
        assert!(Terrain::Desert.is_habitable());
        assert!(!Terrain::Desert.grows_fodder());
    }

    #[test]
    fn test_population_entry_json_shape() {
        let json = r#"{
            "location": [2, 3],
            "population": [
                {"species": "Herbivore", "age": 5, "weight": 20.0},
                {"species": "Carnivore", "age": 0, "weight": 7.5}
            ]
        }"#;
        let entry: PopulationEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.location, Position::new(2, 3));
        assert_eq!(entry.population.len(), 2);
        assert_eq!(entry.population[1].species, Species::Carnivore);

        let unknown = r#"{"species": "Omnivore", "age": 1, "weight": 1.0}"#;
        assert!(serde_json::from_str::<AnimalSpec>(unknown).is_err());
    }
}
