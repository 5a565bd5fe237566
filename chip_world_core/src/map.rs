use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::{Cell, Direction};

/// Failures building a grid from raw cells.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Expected {expected} cells for a {rows} x {cols} grid, got {found}")]
    SizeMismatch {
        rows: usize,
        cols: usize,
        expected: usize,
        found: usize,
    },
}

/// Rectangular board storage, one `T` per cell, laid out row by row.
///
/// Cells are addressed by [`Cell`] and neighbors are computed from the
/// coordinates rather than stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid filled by a generator function called once per cell
    /// in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols` overflows `usize`.
    pub fn from_generator<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(Cell) -> T,
    {
        let size = rows.checked_mul(cols).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(size);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(f(Cell { row, col }));
            }
        }
        Grid { rows, cols, cells }
    }

    /// Wraps an existing row-major vector.
    pub fn from_vec(rows: usize, cols: usize, cells: Vec<T>) -> Result<Self, GridError> {
        let expected = rows.checked_mul(cols).unwrap_or(usize::MAX);
        if cells.len() != expected {
            return Err(GridError::SizeMismatch {
                rows,
                cols,
                expected,
                found: cells.len(),
            });
        }
        Ok(Grid { rows, cols, cells })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Converts a cell to a flat vector index.
    ///
    /// Returns `None` if the cell is out of bounds.
    #[inline]
    pub fn cell_to_index(&self, cell: Cell) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.row * self.cols + cell.col)
        } else {
            None
        }
    }

    /// Checks if the given cell is within the grid boundaries.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    pub fn get(&self, cell: Cell) -> Option<&T> {
        self.cells.get(self.cell_to_index(cell)?)
    }

    /// The cell one step from `cell` in `direction`, if it is inside the grid.
    pub fn step(&self, cell: Cell, direction: Direction) -> Option<Cell> {
        cell.step(direction).filter(|next| self.contains(*next))
    }

    /// The in-bounds orthogonal neighbors of `cell` (up, down, left, right).
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| self.step(cell, direction))
    }

    /// Cell values, top row first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Cell, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Cell, &T)> {
        let cols = self.cols;
        self.cells.iter().enumerate().map(move |(index, value)| {
            (
                Cell {
                    row: index / cols,
                    col: index % cols,
                },
                value,
            )
        })
    }

    /// Builds a grid of the same shape by converting every cell.
    pub fn map<U, F>(&self, mut f: F) -> Grid<U>
    where
        F: FnMut(&T) -> U,
    {
        Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().map(&mut f).collect(),
        }
    }
}

impl<T> Index<Cell> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, cell: Cell) -> &Self::Output {
        match self.cell_to_index(cell) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({} x {})",
                cell, self.rows, self.cols
            ),
        }
    }
}

impl<T> IndexMut<Cell> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, cell: Cell) -> &mut Self::Output {
        let (rows, cols) = (self.rows, self.cols);
        match self.cell_to_index(cell) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({} x {})",
                cell, rows, cols
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_has_two_neighbors() {
        let grid: Grid<u8> = Grid::from_generator(3, 4, |_| 0);
        let neighbors: Vec<Cell> = grid.neighbors(Cell::new(0, 0)).collect();
        assert_eq!(neighbors, vec![Cell::new(1, 0), Cell::new(0, 1)]);

        let far: Vec<Cell> = grid.neighbors(Cell::new(2, 3)).collect();
        assert_eq!(far, vec![Cell::new(1, 3), Cell::new(2, 2)]);
    }

    #[test]
    fn interior_has_four_neighbors() {
        let grid: Grid<u8> = Grid::from_generator(3, 3, |_| 0);
        assert_eq!(grid.neighbors(Cell::new(1, 1)).count(), 4);
    }

    #[test]
    fn row_major_layout() {
        let grid = Grid::from_generator(2, 3, |cell| cell.row * 10 + cell.col);
        assert_eq!(grid.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 10, 11, 12]);
        assert_eq!(grid[Cell::new(1, 2)], 12);
        assert_eq!(grid.enumerate().nth(4), Some((Cell::new(1, 1), &11)));
    }

    #[test]
    fn get_outside_grid_is_none() {
        let grid = Grid::from_generator(2, 2, |_| 0u8);
        assert!(grid.get(Cell::new(0, 2)).is_none());
        assert!(grid.get(Cell::new(2, 0)).is_none());
        assert_eq!(grid.get(Cell::new(1, 1)), Some(&0));
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Grid::from_vec(2, 2, vec![0u8; 4]).is_ok());
        assert!(matches!(
            Grid::from_vec(2, 2, vec![0u8; 3]),
            Err(GridError::SizeMismatch { found: 3, .. })
        ));
    }
}
