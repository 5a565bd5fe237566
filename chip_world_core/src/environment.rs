use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Cell, Direction, EntityId, KeyColor,
    agent::{Agent, SubgoalPlanner},
    loader::{MapError, TileCode},
    map::Grid,
};

/// What occupies a board cell once the map has been loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TileKind {
    #[default]
    Blank,
    Wall,
    Water,
    Chip,
    Key(KeyColor),
    Door(KeyColor),
    GoalGate,
    Goal,
}

impl TileKind {
    /// Walls and water can never be entered.
    pub fn is_obstacle(self) -> bool {
        matches!(self, TileKind::Wall | TileKind::Water)
    }
}

impl From<TileCode> for TileKind {
    fn from(code: TileCode) -> Self {
        match code {
            TileCode::Blank | TileCode::AgentStart => TileKind::Blank,
            TileCode::Wall => TileKind::Wall,
            TileCode::Water => TileKind::Water,
            TileCode::Chip => TileKind::Chip,
            TileCode::Goal => TileKind::Goal,
            TileCode::GoalGate => TileKind::GoalGate,
            TileCode::Door(color) => TileKind::Door(color),
            TileCode::Key(color) => TileKind::Key(color),
        }
    }
}

/// A single move request. Doors, the gate and chips are handled by walking
/// onto them; there is no separate pick-up or unlock action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Wait,
    Move(Direction),
}

/// Why a requested move was dropped. Never fatal: the world is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalMove {
    #[error("agent {0} not found")]
    UnknownAgent(EntityId),
    #[error("target position is out of bounds")]
    OutOfBounds,
    #[error("cannot move into {0:?}")]
    Impassable(TileKind),
    #[error("agent lacks a {0:?} key")]
    MissingKey(KeyColor),
    #[error("goal gate is closed while {remaining} chips remain")]
    GateClosed { remaining: usize },
}

/// How the world answered a move request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Success,
    Waited,
    Blocked(IllegalMove),
    Win,
}

/// Keys held by an agent. Duplicate colors are kept and consumed one at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    keys: Vec<KeyColor>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, color: KeyColor) {
        self.keys.push(color);
    }

    pub fn contains(&self, color: KeyColor) -> bool {
        self.keys.contains(&color)
    }

    pub fn count(&self, color: KeyColor) -> usize {
        self.keys.iter().filter(|k| **k == color).count()
    }

    /// Removes one key of `color`. Returns false if none was held.
    pub fn consume(&mut self, color: KeyColor) -> bool {
        match self.keys.iter().position(|k| *k == color) {
            Some(index) => {
                self.keys.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<KeyColor> for Inventory {
    fn from_iter<I: IntoIterator<Item = KeyColor>>(iter: I) -> Self {
        Inventory {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Where a collector stands and which keys it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: EntityId,
    pub position: Cell,
    pub inventory: Inventory,
}

/// The full mutable snapshot of a run: tiles, agents and the chip counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    tiles: Grid<TileKind>,
    agents: Vec<AgentState>,
    remaining_chips: usize,
    goal: Cell,
    goal_gate: Option<Cell>,
}

impl WorldState {
    /// Builds the world from a decoded map. Every `AgentStart` spawns an
    /// agent, numbered in row-major order.
    pub fn from_grid(grid: &Grid<TileCode>) -> Result<Self, MapError> {
        let mut agents = Vec::new();
        let mut goal: Option<Cell> = None;
        let mut goal_gate = None;
        let mut remaining_chips = 0;

        for (cell, code) in grid.enumerate() {
            match code {
                TileCode::AgentStart => agents.push(AgentState {
                    id: agents.len(),
                    position: cell,
                    inventory: Inventory::new(),
                }),
                TileCode::Chip => remaining_chips += 1,
                TileCode::Goal => {
                    if let Some(first) = goal {
                        return Err(MapError::MultipleGoals {
                            first,
                            second: cell,
                        });
                    }
                    goal = Some(cell);
                }
                TileCode::GoalGate => {
                    goal_gate.get_or_insert(cell);
                }
                _ => {}
            }
        }

        if agents.is_empty() {
            return Err(MapError::MissingStart);
        }
        let goal = goal.ok_or(MapError::MissingGoal)?;

        Ok(WorldState {
            tiles: grid.map(|code| TileKind::from(*code)),
            agents,
            remaining_chips,
            goal,
            goal_gate,
        })
    }

    pub fn tiles(&self) -> &Grid<TileKind> {
        &self.tiles
    }

    pub fn tile(&self, cell: Cell) -> Option<TileKind> {
        self.tiles.get(cell).copied()
    }

    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        self.tiles.neighbors(cell)
    }

    pub fn agents(&self) -> &[AgentState] {
        &self.agents
    }

    pub fn agent(&self, agent_id: EntityId) -> Option<&AgentState> {
        self.agents.iter().find(|a| a.id == agent_id)
    }

    pub fn inventory(&self, agent_id: EntityId) -> Option<&Inventory> {
        self.agent(agent_id).map(|a| &a.inventory)
    }

    pub fn remaining_chips(&self) -> usize {
        self.remaining_chips
    }

    pub fn goal(&self) -> Cell {
        self.goal
    }

    pub fn goal_gate(&self) -> Option<Cell> {
        self.goal_gate
    }

    /// All cells whose tile satisfies `pred`, in row-major order.
    pub fn cells_where<F>(&self, mut pred: F) -> Vec<Cell>
    where
        F: FnMut(TileKind) -> bool,
    {
        self.tiles
            .enumerate()
            .filter(|(_, tile)| pred(**tile))
            .map(|(cell, _)| cell)
            .collect()
    }

    /// True once some agent stands on the goal with every chip collected.
    pub fn is_goal_reached(&self) -> bool {
        self.remaining_chips == 0 && self.agents.iter().any(|a| a.position == self.goal)
    }

    /// Checks whether an agent holding `inventory` may enter `target`.
    pub fn check_entry(&self, target: Cell, inventory: &Inventory) -> Result<(), IllegalMove> {
        let tile = self.tile(target).ok_or(IllegalMove::OutOfBounds)?;
        match tile {
            TileKind::Wall | TileKind::Water => Err(IllegalMove::Impassable(tile)),
            TileKind::Door(color) if !inventory.contains(color) => {
                Err(IllegalMove::MissingKey(color))
            }
            TileKind::GoalGate if self.remaining_chips > 0 => Err(IllegalMove::GateClosed {
                remaining: self.remaining_chips,
            }),
            _ => Ok(()),
        }
    }

    pub fn is_legal_move(&self, agent_id: EntityId, target: Cell) -> bool {
        self.agent(agent_id)
            .is_some_and(|a| self.check_entry(target, &a.inventory).is_ok())
    }

    /// Applies one requested action for an agent. Illegal moves leave the
    /// world untouched.
    pub fn apply_action(&mut self, agent_id: EntityId, action: Action) -> ActionResult {
        let Some(index) = self.agents.iter().position(|a| a.id == agent_id) else {
            return ActionResult::Blocked(IllegalMove::UnknownAgent(agent_id));
        };

        let direction = match action {
            Action::Wait => return ActionResult::Waited,
            Action::Move(direction) => direction,
        };

        let current = self.agents[index].position;
        let target = match self.tiles.step(current, direction) {
            Some(cell) => cell,
            None => return ActionResult::Blocked(IllegalMove::OutOfBounds),
        };

        if let Err(reason) = self.check_entry(target, &self.agents[index].inventory) {
            debug!(agent = agent_id, %target, %reason, "Move blocked");
            return ActionResult::Blocked(reason);
        }

        self.agents[index].position = target;
        self.enter_tile(index, target);

        if self.is_goal_reached() {
            ActionResult::Win
        } else {
            ActionResult::Success
        }
    }

    /// Fires the entry effect of the tile the agent just stepped onto.
    fn enter_tile(&mut self, index: usize, cell: Cell) {
        let agent = &mut self.agents[index];
        let tile = &mut self.tiles[cell];
        match *tile {
            TileKind::Chip => {
                self.remaining_chips = self.remaining_chips.saturating_sub(1);
                debug!(agent = agent.id, %cell, remaining = self.remaining_chips, "Collected chip");
            }
            TileKind::Key(color) => {
                agent.inventory.add(color);
                debug!(agent = agent.id, %cell, ?color, "Picked up key");
            }
            TileKind::Door(color) => {
                agent.inventory.consume(color);
                debug!(agent = agent.id, %cell, ?color, "Unlocked door");
            }
            TileKind::GoalGate => {
                debug!(agent = agent.id, %cell, "Passed goal gate");
            }
            TileKind::Blank | TileKind::Goal | TileKind::Wall | TileKind::Water => return,
        }
        *tile = TileKind::Blank;
    }
}

/// What a collector sees when choosing a move: its own position and keys,
/// plus the whole board and the chip counter.
#[derive(Debug)]
pub struct EnvironmentView<'a> {
    pub agent_state: &'a AgentState,
    pub world: &'a WorldState,
}

/// One agent's part of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTurn {
    pub agent: EntityId,
    pub action: Action,
    pub result: ActionResult,
}

/// Everything that happened during one call to [`Environment::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub turns: Vec<AgentTurn>,
}

impl TickOutcome {
    pub fn is_win(&self) -> bool {
        self.turns.iter().any(|t| t.result == ActionResult::Win)
    }

    /// The action requested by `agent` this tick, if it had a turn.
    pub fn action_of(&self, agent: EntityId) -> Option<Action> {
        self.turns.iter().find(|t| t.agent == agent).map(|t| t.action)
    }
}

/// A board plus the controller steering each collector on it.
pub struct Environment {
    world: WorldState,
    behaviors: Vec<Box<dyn Agent>>,
}

impl Environment {
    /// Builds the world from a decoded map and drives every agent with a
    /// [`SubgoalPlanner`].
    pub fn initialize(grid: &Grid<TileCode>) -> Result<Self, MapError> {
        let world = WorldState::from_grid(grid)?;
        let behaviors = world
            .agents()
            .iter()
            .map(|a| Box::new(SubgoalPlanner::new(a.id)) as Box<dyn Agent>)
            .collect();
        Ok(Environment { world, behaviors })
    }

    /// Attaches custom behaviors. Behaviors whose id has no agent are ignored
    /// at tick time.
    pub fn with_agents(world: WorldState, behaviors: Vec<Box<dyn Agent>>) -> Self {
        Environment { world, behaviors }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Runs one turn for every agent in order. Each agent sees the result of
    /// the previous agent's committed move.
    pub fn tick(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        for behavior in self.behaviors.iter_mut() {
            let agent_id = behavior.id();
            let Some(agent_state) = self.world.agent(agent_id) else {
                continue;
            };
            let view = EnvironmentView {
                agent_state,
                world: &self.world,
            };
            let action = behavior.get_action(&view);
            let result = self.world.apply_action(agent_id, action);
            let won = result == ActionResult::Win;
            outcome.turns.push(AgentTurn {
                agent: agent_id,
                action,
                result,
            });
            if won {
                break;
            }
        }

        outcome
    }

    pub fn is_goal_reached(&self) -> bool {
        self.world.is_goal_reached()
    }

    pub fn remaining_chips(&self) -> usize {
        self.world.remaining_chips()
    }

    pub fn inventory(&self, agent_id: EntityId) -> Option<&Inventory> {
        self.world.inventory(agent_id)
    }
}
