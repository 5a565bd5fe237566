use serde::{Deserialize, Serialize};

pub mod agent;
pub mod environment;
pub mod loader;
pub mod map;
pub mod pathfinding;
pub mod simulation;

/// Index of a collector, assigned in row-major order of its `ST` tile.
pub type EntityId = usize;

/// A (row, col) coordinate in the grid. Row 0 is the top line of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Cell { row, col }
    }

    /// Returns manhattan distance between two cells
    pub fn manhattan_distance(self, other: Cell) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// The cell one step away in `direction`, or `None` when that would go
    /// below row or column zero. Upper bounds are checked by the grid.
    pub fn step(self, direction: Direction) -> Option<Cell> {
        let (dr, dc) = direction.delta();
        Some(Cell {
            row: self.row.checked_add_signed(dr)?,
            col: self.col.checked_add_signed(dc)?,
        })
    }

    /// Direction that leads from `self` to an orthogonally adjacent `other`.
    pub fn direction_to(self, other: Cell) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|direction| self.step(*direction) == Some(other))
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The four orthogonal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// (row, col) offset of one step.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Shared color of a door and the key that opens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyColor {
    Red,
    Green,
    Blue,
    Yellow,
}

impl KeyColor {
    pub const ALL: [KeyColor; 4] = [
        KeyColor::Red,
        KeyColor::Green,
        KeyColor::Blue,
        KeyColor::Yellow,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_stops_at_zero() {
        let origin = Cell::new(0, 0);
        assert_eq!(origin.step(Direction::Up), None);
        assert_eq!(origin.step(Direction::Left), None);
        assert_eq!(origin.step(Direction::Down), Some(Cell::new(1, 0)));
        assert_eq!(origin.step(Direction::Right), Some(Cell::new(0, 1)));
    }

    #[test]
    fn direction_to_adjacent_only() {
        let c = Cell::new(2, 2);
        assert_eq!(c.direction_to(Cell::new(1, 2)), Some(Direction::Up));
        assert_eq!(c.direction_to(Cell::new(2, 3)), Some(Direction::Right));
        assert_eq!(c.direction_to(Cell::new(3, 3)), None);
        assert_eq!(c.direction_to(c), None);
    }

    #[test]
    fn manhattan_is_symmetric() {
        let a = Cell::new(0, 4);
        let b = Cell::new(3, 1);
        assert_eq!(a.manhattan_distance(b), 6);
        assert_eq!(b.manhattan_distance(a), 6);
    }
}
