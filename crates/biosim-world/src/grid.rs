//! Terrain map and neighbour topology of the island.

use biosim_core::{Direction, Error, Position, Result, Terrain};
use serde::{Deserialize, Serialize};

/// A rectangular, non-wrapping grid of terrain whose border is all water.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: i32,
    pub cols: i32,
    tiles: Vec<Terrain>,
}

impl Grid {
    /// Parse a multi-line map of `W`, `L`, `H` and `D` symbols.
    ///
    /// Surrounding whitespace on each line and blank lines before or after
    /// the map are ignored, so indented string literals can be used directly.
    pub fn parse(map: &str) -> Result<Self> {
        let lines: Vec<&str> = map.lines().map(str::trim).collect();
        let first = lines.iter().position(|line| !line.is_empty());
        let last = lines.iter().rposition(|line| !line.is_empty());
        let lines = match (first, last) {
            (Some(first), Some(last)) => &lines[first..=last],
            _ => return Err(Error::Configuration("Island map is empty".to_string())),
        };

        let cols = lines[0].chars().count();
        let mut tiles = Vec::with_capacity(cols * lines.len());

        for (row, line) in lines.iter().enumerate() {
            let length = line.chars().count();
            if length != cols {
                return Err(Error::Configuration(format!(
                    "Island map rows must have equal length: row {} has {} cells, expected {}",
                    row, length, cols
                )));
            }
            for (col, symbol) in line.chars().enumerate() {
                let terrain = Terrain::from_symbol(symbol).ok_or_else(|| {
                    Error::Configuration(format!(
                        "Unknown terrain symbol '{}' at ({}, {})",
                        symbol, row, col
                    ))
                })?;
                tiles.push(terrain);
            }
        }

        let grid = Self {
            rows: lines.len() as i32,
            cols: cols as i32,
            tiles,
        };
        grid.check_border()?;
        Ok(grid)
    }

    fn check_border(&self) -> Result<()> {
        for pos in self.positions() {
            let on_border = pos.row == 0
                || pos.col == 0
                || pos.row == self.rows - 1
                || pos.col == self.cols - 1;
            if on_border && self.tiles[self.index(pos)] != Terrain::Water {
                return Err(Error::Configuration(format!(
                    "Island must be surrounded by water, found {} at {}",
                    self.tiles[self.index(pos)],
                    pos
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.col >= 0 && pos.row < self.rows && pos.col < self.cols
    }

    /// Terrain at position, or `None` off the grid
    pub fn terrain(&self, pos: Position) -> Option<Terrain> {
        self.index_of(pos).map(|index| self.tiles[index])
    }

    /// Row-major index of an on-grid position.
    pub fn index_of(&self, pos: Position) -> Option<usize> {
        self.contains(pos).then(|| self.index(pos))
    }

    fn index(&self, pos: Position) -> usize {
        (pos.row * self.cols + pos.col) as usize
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let row = (index as i32) / self.cols;
        let col = (index as i32) % self.cols;
        Position::new(row, col)
    }

    /// The neighbour one step away, if it exists.
    pub fn neighbour(&self, pos: Position, direction: Direction) -> Option<Position> {
        let next = pos.step(direction);
        self.contains(next).then_some(next)
    }

    /// Iterator over all positions
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.tiles.len()).map(move |i| self.index_to_pos(i))
    }

    /// Iterator over all tiles with positions
    pub fn iter(&self) -> impl Iterator<Item = (Position, Terrain)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, terrain)| (self.index_to_pos(i), *terrain))
    }

    /// Render the map back to its symbol form.
    pub fn to_map_string(&self) -> String {
        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| self.tiles[self.index(Position::new(row, col))].symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
