use std::collections::{HashMap, VecDeque};

use chip_world_core::{
    Cell, Direction, KeyColor,
    environment::{Action, ActionResult, TileKind, WorldState},
    loader::TileCode,
    map::Grid,
    pathfinding::PathFinder,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn bfs_distances(tiles: &Grid<TileKind>, from: Cell) -> HashMap<Cell, usize> {
    let mut dist = HashMap::new();
    let mut queue = VecDeque::new();
    if tiles[from].is_obstacle() {
        return dist;
    }
    dist.insert(from, 0);
    queue.push_back(from);
    while let Some(cell) = queue.pop_front() {
        let d = dist[&cell];
        for next in tiles.neighbors(cell) {
            if !tiles[next].is_obstacle() && !dist.contains_key(&next) {
                dist.insert(next, d + 1);
                queue.push_back(next);
            }
        }
    }
    dist
}

fn random_wall_grid(rng: &mut StdRng, rows: usize, cols: usize) -> Grid<TileKind> {
    Grid::from_generator(rows, cols, |_| {
        if rng.random_bool(0.3) {
            TileKind::Wall
        } else {
            TileKind::Blank
        }
    })
}

#[test]
fn astar_matches_bfs_on_random_wall_grids() {
    let mut rng = StdRng::seed_from_u64(411);

    for _ in 0..200 {
        let rows = rng.random_range(2..12);
        let cols = rng.random_range(2..12);
        let tiles = random_wall_grid(&mut rng, rows, cols);
        let start = Cell::new(rng.random_range(0..rows), rng.random_range(0..cols));
        let target = Cell::new(rng.random_range(0..rows), rng.random_range(0..cols));
        if tiles[start].is_obstacle() {
            continue;
        }

        let from_start = bfs_distances(&tiles, start);
        let path = PathFinder::find_path(&tiles, start, target);

        match from_start.get(&target) {
            None => assert_eq!(path, None, "{start} -> {target} should be unreachable"),
            Some(&expected) => {
                let path = path.expect("reachable target must have a path");
                assert_eq!(path.len() - 1, expected);
                assert_eq!(path.first(), Some(&start));
                assert_eq!(path.last(), Some(&target));
                for pair in path.windows(2) {
                    assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
                    assert!(!tiles[pair[1]].is_obstacle());
                }

                if expected > 0 {
                    let step = PathFinder::next_step(&tiles, start, target).unwrap();
                    let first = start.step(step).unwrap();
                    let to_target = bfs_distances(&tiles, first);
                    assert_eq!(to_target[&target], expected - 1);
                }
            }
        }
    }
}

fn random_world(rng: &mut StdRng) -> WorldState {
    let rows = rng.random_range(3..9);
    let cols = rng.random_range(3..9);
    let goal = Cell::new(rows - 1, cols - 1);
    let start = Cell::new(0, 0);

    let grid = Grid::from_generator(rows, cols, |cell| {
        if cell == start {
            return TileCode::AgentStart;
        }
        if cell == goal {
            return TileCode::Goal;
        }
        let color = KeyColor::ALL[rng.random_range(0..4)];
        match rng.random_range(0..20) {
            0..=2 => TileCode::Wall,
            3 => TileCode::Water,
            4..=5 => TileCode::Chip,
            6 => TileCode::Key(color),
            7 => TileCode::Door(color),
            8 => TileCode::GoalGate,
            _ => TileCode::Blank,
        }
    });
    WorldState::from_grid(&grid).unwrap()
}

#[test]
fn random_walks_respect_legality() {
    let mut rng = StdRng::seed_from_u64(6);

    for _ in 0..100 {
        let mut world = random_world(&mut rng);

        for _ in 0..150 {
            let direction = Direction::ALL[rng.random_range(0..4)];
            let before = world.clone();
            let agent = before.agent(0).unwrap();
            let result = world.apply_action(0, Action::Move(direction));
            let after = world.agent(0).unwrap();

            match result {
                ActionResult::Blocked(_) => {
                    assert_eq!(world, before, "blocked move changed state");
                    continue;
                }
                ActionResult::Success | ActionResult::Win => {}
                ActionResult::Waited => unreachable!(),
            }

            let entered = before.tile(after.position).unwrap();
            assert!(!entered.is_obstacle());

            match entered {
                TileKind::Door(color) => {
                    assert!(agent.inventory.contains(color));
                    assert_eq!(
                        after.inventory.count(color),
                        agent.inventory.count(color) - 1
                    );
                    assert_eq!(world.tile(after.position), Some(TileKind::Blank));
                }
                TileKind::GoalGate => {
                    assert_eq!(before.remaining_chips(), 0);
                    assert_eq!(world.tile(after.position), Some(TileKind::Blank));
                }
                TileKind::Chip => {
                    assert_eq!(world.remaining_chips(), before.remaining_chips() - 1);
                    assert_eq!(world.tile(after.position), Some(TileKind::Blank));
                }
                TileKind::Key(color) => {
                    assert_eq!(
                        after.inventory.count(color),
                        agent.inventory.count(color) + 1
                    );
                }
                TileKind::Blank | TileKind::Goal => {
                    assert_eq!(world.remaining_chips(), before.remaining_chips());
                    assert_eq!(after.inventory, agent.inventory);
                }
                TileKind::Wall | TileKind::Water => unreachable!(),
            }

            assert_eq!(
                world.is_goal_reached(),
                after.position == world.goal() && world.remaining_chips() == 0
            );
        }
    }
}

#[test]
fn remaining_chips_matches_board() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..50 {
        let mut world = random_world(&mut rng);
        for _ in 0..100 {
            let direction = Direction::ALL[rng.random_range(0..4)];
            world.apply_action(0, Action::Move(direction));
            let on_board = world.cells_where(|t| t == TileKind::Chip).len();
            assert_eq!(world.remaining_chips(), on_board);
        }
    }
}
