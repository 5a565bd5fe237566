//! A* search over the tile grid.
//!
//! Search only treats walls and water as blocked. Doors, keys and the goal
//! gate are ordinary floor here; deciding whether the agent may actually pass
//! them is the planner's job. Nothing is cached between calls because the grid
//! changes as items are consumed.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
};

use crate::{Cell, Direction, environment::TileKind, map::Grid};

#[derive(Clone, Eq, PartialEq)]
struct Node {
    f_score: usize,
    seq: u64,
    cell: Cell,
    g_score: usize,
}

impl Ord for Node {
    // Reversed so that the max-heap pops the lowest f first; ties go to the
    // earliest insertion, then the lowest (row, col).
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Stateless A* path finder with unit step cost and a manhattan heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathFinder;

impl PathFinder {
    /// Returns the optimal path from `start` to `target`, both included, or
    /// `None` when the target cannot be reached.
    #[tracing::instrument(level = "trace", skip_all, fields(%start, %target))]
    pub fn find_path(tiles: &Grid<TileKind>, start: Cell, target: Cell) -> Option<Vec<Cell>> {
        if !tiles.contains(start) || !tiles.contains(target) {
            return None;
        }

        let mut frontier = BinaryHeap::new();
        let mut came_from: HashMap<Cell, Cell> = HashMap::new();
        let mut cost_so_far: HashMap<Cell, usize> = HashMap::new();
        let mut seq = 0u64;
        let mut expansions = 0usize;

        cost_so_far.insert(start, 0);
        frontier.push(Node {
            f_score: start.manhattan_distance(target),
            seq,
            cell: start,
            g_score: 0,
        });

        while let Some(Node {
            cell: current,
            g_score,
            ..
        }) = frontier.pop()
        {
            if current == target {
                tracing::trace!(expansions, cost = g_score, "Path found");
                return Some(reconstruct_path(&came_from, start, target));
            }

            // Skip entries superseded by a cheaper route.
            if cost_so_far.get(&current).is_some_and(|best| g_score > *best) {
                continue;
            }
            expansions += 1;

            for neighbor in tiles.neighbors(current) {
                if tiles[neighbor].is_obstacle() {
                    continue;
                }

                let new_cost = g_score + 1;
                if cost_so_far.get(&neighbor).is_none_or(|known| new_cost < *known) {
                    cost_so_far.insert(neighbor, new_cost);
                    came_from.insert(neighbor, current);
                    seq += 1;
                    frontier.push(Node {
                        f_score: new_cost + neighbor.manhattan_distance(target),
                        seq,
                        cell: neighbor,
                        g_score: new_cost,
                    });
                }
            }
        }

        tracing::trace!(expansions, "No path found");
        None
    }

    /// The first move of an optimal path, or `None` if the target is
    /// unreachable or already occupied by `start`.
    pub fn next_step(tiles: &Grid<TileKind>, start: Cell, target: Cell) -> Option<Direction> {
        let path = Self::find_path(tiles, start, target)?;
        let first = *path.get(1)?;
        start.direction_to(first)
    }
}

fn reconstruct_path(came_from: &HashMap<Cell, Cell>, start: Cell, target: Cell) -> Vec<Cell> {
    let mut path = vec![target];
    let mut current = target;
    while current != start {
        match came_from.get(&current) {
            Some(previous) => {
                current = *previous;
                path.push(current);
            }
            None => break,
        }
    }
    path.reverse();
    path
}
