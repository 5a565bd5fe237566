use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Cell, KeyColor,
    map::{Grid, GridError},
};

/// Errors produced while decoding a map or building a world from it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("Map string is empty")]
    Empty,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map code '{token}' at {cell}")]
    UnknownTile { token: String, cell: Cell },
    #[error("No start position ('ST') found in map")]
    MissingStart,
    #[error("No goal ('PL') found in map")]
    MissingGoal,
    #[error("Multiple goals ('PL') found at {first} and {second}")]
    MultipleGoals { first: Cell, second: Cell },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// A decoded map tile, before the world is built from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileCode {
    Blank,
    Wall,
    Water,
    Chip,
    Goal,
    GoalGate,
    Door(KeyColor),
    Key(KeyColor),
    AgentStart,
}

impl TileCode {
    /// The two-letter token used in map files.
    pub fn token(self) -> &'static str {
        match self {
            TileCode::Blank => "BL",
            TileCode::Wall => "WL",
            TileCode::Water => "WA",
            TileCode::Chip => "CH",
            TileCode::Goal => "PL",
            TileCode::GoalGate => "DP",
            TileCode::AgentStart => "ST",
            TileCode::Door(KeyColor::Red) => "DR",
            TileCode::Door(KeyColor::Green) => "DG",
            TileCode::Door(KeyColor::Blue) => "DB",
            TileCode::Door(KeyColor::Yellow) => "DY",
            TileCode::Key(KeyColor::Red) => "KR",
            TileCode::Key(KeyColor::Green) => "KG",
            TileCode::Key(KeyColor::Blue) => "KB",
            TileCode::Key(KeyColor::Yellow) => "KY",
        }
    }
}

impl fmt::Display for TileCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for TileCode {
    type Err = ();

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let code = match token {
            "ST" => TileCode::AgentStart,
            "BL" => TileCode::Blank,
            "WL" => TileCode::Wall,
            "WA" => TileCode::Water,
            "CH" => TileCode::Chip,
            "PL" => TileCode::Goal,
            "DP" => TileCode::GoalGate,
            "DR" => TileCode::Door(KeyColor::Red),
            "DG" => TileCode::Door(KeyColor::Green),
            "DB" => TileCode::Door(KeyColor::Blue),
            "DY" => TileCode::Door(KeyColor::Yellow),
            "KR" => TileCode::Key(KeyColor::Red),
            "KG" => TileCode::Key(KeyColor::Green),
            "KB" => TileCode::Key(KeyColor::Blue),
            "KY" => TileCode::Key(KeyColor::Yellow),
            _ => return Err(()),
        };
        Ok(code)
    }
}

/// Decodes a map from its text form: one line per row, one whitespace
/// separated token per cell.
pub fn decode_map(map_string: &str) -> Result<Grid<TileCode>, MapError> {
    let lines: Vec<&str> = map_string.trim().lines().collect();
    if lines.is_empty() {
        return Err(MapError::Empty);
    }

    let rows = lines.len();
    let mut cols = 0;
    let mut codes = Vec::new();

    for (row, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if row == 0 {
            cols = tokens.len();
            codes.reserve(rows * cols);
        } else if tokens.len() != cols {
            return Err(MapError::InconsistentWidth {
                row,
                expected: cols,
                found: tokens.len(),
            });
        }

        for (col, token) in tokens.into_iter().enumerate() {
            let code = token.parse().map_err(|()| MapError::UnknownTile {
                token: token.to_string(),
                cell: Cell { row, col },
            })?;
            codes.push(code);
        }
    }

    Ok(Grid::from_vec(rows, cols, codes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_token() {
        let grid = decode_map(
            "ST BL WL WA CH\n\
             PL DP DR DG DB\n\
             DY KR KG KB KY",
        )
        .unwrap();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 5);
        assert_eq!(grid[Cell::new(0, 0)], TileCode::AgentStart);
        assert_eq!(grid[Cell::new(0, 3)], TileCode::Water);
        assert_eq!(grid[Cell::new(1, 1)], TileCode::GoalGate);
        assert_eq!(grid[Cell::new(1, 4)], TileCode::Door(KeyColor::Blue));
        assert_eq!(grid[Cell::new(2, 4)], TileCode::Key(KeyColor::Yellow));
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let grid = decode_map("\n  ST  BL \nBL   PL\n\n").unwrap();
        assert_eq!((grid.rows(), grid.cols()), (2, 2));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = decode_map("ST BL BL\nBL PL").unwrap_err();
        assert_eq!(
            err,
            MapError::InconsistentWidth {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn rejects_unknown_token() {
        let err = decode_map("ST XX\nBL PL").unwrap_err();
        assert_eq!(
            err,
            MapError::UnknownTile {
                token: "XX".to_string(),
                cell: Cell::new(0, 1)
            }
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(decode_map("   \n\n").unwrap_err(), MapError::Empty);
    }
}
