use std::{cmp::Ordering, collections::BinaryHeap};

use tracing::{debug, warn};

use crate::{
    Cell, EntityId,
    environment::{Action, EnvironmentView, Inventory, TileKind},
    pathfinding::PathFinder,
};

/// A controller for one chip collector on the board.
pub trait Agent {
    /// Index of the controlled agent in [`WorldState::agents`](crate::environment::WorldState::agents).
    fn id(&self) -> EntityId;

    /// Picks this tick's move from the current board, held keys and chip
    /// count. Illegal picks are dropped by the world, so returning
    /// [`Action::Wait`] is always safe.
    fn get_action(&mut self, view: &EnvironmentView) -> Action;
}

/// Faults raised while the planner inspects the world. They never escape
/// [`Agent::get_action`]; the agent waits for a tick instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlannerFault {
    #[error("agent position {0} is outside the grid")]
    AgentOutOfBounds(Cell),
    #[error("no tile at candidate {0}")]
    MissingTile(Cell),
}

/// A door is out of reach this tick when no matching key is held.
pub fn lacks_key_for_door(tile: TileKind, inventory: &Inventory) -> bool {
    matches!(tile, TileKind::Door(color) if !inventory.contains(color))
}

/// The gate is never targeted while chips remain.
pub fn gate_needs_chips(tile: TileKind, remaining_chips: usize) -> bool {
    tile == TileKind::GoalGate && remaining_chips > 0
}

/// The goal defers to outstanding chips, but unlike the gate it may still be
/// targeted.
pub fn goal_needs_chips(tile: TileKind, remaining_chips: usize) -> bool {
    tile == TileKind::Goal && remaining_chips > 0
}

/// True when `target` is strictly nearer than `chip`, in which case the
/// planner looks past `target` to the next queued candidate.
pub fn chip_lies_beyond(origin: Cell, target: Cell, chip: Cell) -> bool {
    origin.manhattan_distance(target) < origin.manhattan_distance(chip)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    distance: usize,
    seq: u64,
    cell: Cell,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Nearest first, then oldest.
        other
            .distance
            .cmp(&self.distance)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Subgoals ordered by straight-line (manhattan) distance from the agent,
/// oldest first among equals.
#[derive(Debug)]
struct SubgoalQueue {
    origin: Cell,
    heap: BinaryHeap<Candidate>,
    seq: u64,
}

impl SubgoalQueue {
    fn new(origin: Cell) -> Self {
        Self {
            origin,
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    fn push(&mut self, cell: Cell) {
        self.heap.push(Candidate {
            distance: self.origin.manhattan_distance(cell),
            seq: self.seq,
            cell,
        });
        self.seq += 1;
    }

    fn extend<I: IntoIterator<Item = Cell>>(&mut self, cells: I) {
        for cell in cells {
            self.push(cell);
        }
    }

    fn pop(&mut self) -> Option<Cell> {
        self.heap.pop().map(|c| c.cell)
    }

    /// Re-queues every outstanding chip. Each chip lying beyond the current
    /// target advances the target to the next queued candidate. Returns the
    /// resulting target.
    fn defer_to_chips(&mut self, mut target: Cell, chips: &[Cell]) -> Cell {
        for &chip in chips {
            if chip != self.origin {
                self.push(chip);
            }
            if chip_lies_beyond(self.origin, target, chip) {
                if let Some(next) = self.pop() {
                    target = next;
                }
            }
        }
        target
    }
}

/// Picks the nearest live subgoal every tick and takes one A* step toward it.
///
/// The ranking is by straight-line distance with a few override rules for
/// doors, the goal gate and the goal; it is a heuristic, not an optimal
/// planner.
#[derive(Debug)]
pub struct SubgoalPlanner {
    id: EntityId,
    current_target: Option<Cell>,
}

impl SubgoalPlanner {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            current_target: None,
        }
    }

    /// The subgoal chosen on the most recent tick.
    pub fn current_target(&self) -> Option<Cell> {
        self.current_target
    }

    /// Chooses this tick's subgoal, or `None` when every candidate was ruled out.
    pub fn choose_target(&self, view: &EnvironmentView) -> Result<Option<Cell>, PlannerFault> {
        let world = view.world;
        let origin = view.agent_state.position;
        let inventory = &view.agent_state.inventory;
        let remaining = world.remaining_chips();

        if world.tile(origin).is_none() {
            return Err(PlannerFault::AgentOutOfBounds(origin));
        }

        let chips = world.cells_where(|t| t == TileKind::Chip);
        let doors = world.cells_where(|t| matches!(t, TileKind::Door(_) | TileKind::GoalGate));
        let keys = world.cells_where(|t| matches!(t, TileKind::Key(_)));

        let mut queue = SubgoalQueue::new(origin);
        queue.extend(chips.iter().copied());
        queue.extend(doors.into_iter().filter(|c| *c != origin));
        queue.extend(keys.into_iter().filter(|c| *c != origin));
        queue.push(world.goal());

        while let Some(candidate) = queue.pop() {
            let tile = world
                .tile(candidate)
                .ok_or(PlannerFault::MissingTile(candidate))?;

            if lacks_key_for_door(tile, inventory) {
                continue;
            }

            if gate_needs_chips(tile, remaining) {
                queue.defer_to_chips(candidate, &chips);
                continue;
            }

            let target = if goal_needs_chips(tile, remaining) {
                queue.defer_to_chips(candidate, &chips)
            } else {
                candidate
            };
            return Ok(Some(target));
        }

        Ok(None)
    }
}

impl Agent for SubgoalPlanner {
    fn id(&self) -> EntityId {
        self.id
    }

    fn get_action(&mut self, view: &EnvironmentView) -> Action {
        let origin = view.agent_state.position;

        match self.choose_target(view) {
            Ok(Some(target)) => {
                self.current_target = Some(target);
                let action = PathFinder::next_step(view.world.tiles(), origin, target)
                    .map_or(Action::Wait, Action::Move);
                debug!(agent = self.id, %origin, %target, ?action, "Planned step");
                action
            }
            Ok(None) => {
                self.current_target = None;
                debug!(agent = self.id, %origin, "No eligible subgoal");
                Action::Wait
            }
            Err(fault) => {
                warn!(agent = self.id, %fault, "Planner fault, waiting this tick");
                Action::Wait
            }
        }
    }
}
