use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    environment::Environment,
    loader::{MapError, TileCode},
    map::Grid,
};

/// Iteration budget used when none is given.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Fraction of trials that must reach the goal for a map to pass.
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.7;

/// Run settings, passed explicitly to every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub max_iterations: usize,
    /// Wall-clock budget, checked between ticks.
    pub time_limit: Option<Duration>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            time_limit: None,
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    GoalReached,
    IterationLimit,
    TimeLimit,
}

/// Performance measure of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub ticks: usize,
    pub goal_reached: bool,
    pub remaining_chips: usize,
    pub stop_reason: StopReason,
}

/// Ticks `environment` until the goal is reached or a budget runs out.
pub fn run(environment: &mut Environment, config: &SimulationConfig) -> SimulationReport {
    let started = Instant::now();
    let mut ticks = 0;

    let stop_reason = loop {
        if environment.is_goal_reached() {
            break StopReason::GoalReached;
        }
        if ticks >= config.max_iterations {
            break StopReason::IterationLimit;
        }
        if config
            .time_limit
            .is_some_and(|limit| started.elapsed() >= limit)
        {
            break StopReason::TimeLimit;
        }

        let outcome = environment.tick();
        ticks += 1;
        debug!(tick = ticks, turns = ?outcome.turns, "Tick complete");
    };

    let report = SimulationReport {
        ticks,
        goal_reached: environment.is_goal_reached(),
        remaining_chips: environment.remaining_chips(),
        stop_reason,
    };
    info!(
        ticks = report.ticks,
        remaining_chips = report.remaining_chips,
        goal_reached = report.goal_reached,
        stop_reason = ?report.stop_reason,
        "Simulation complete"
    );
    report
}

/// Success count over repeated runs of one map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSummary {
    pub trials: usize,
    pub successes: usize,
}

impl TrialSummary {
    pub fn success_rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.successes as f64 / self.trials as f64
        }
    }

    pub fn passes(&self, threshold: f64) -> bool {
        self.trials > 0 && self.success_rate() >= threshold
    }
}

/// Runs `trials` fresh environments built from `grid`.
pub fn run_trials(
    grid: &Grid<TileCode>,
    config: &SimulationConfig,
    trials: usize,
) -> Result<TrialSummary, MapError> {
    let mut successes = 0;
    for trial in 0..trials {
        let mut environment = Environment::initialize(grid)?;
        let report = run(&mut environment, config);
        debug!(trial, ?report, "Trial finished");
        if report.goal_reached {
            successes += 1;
        }
    }
    Ok(TrialSummary { trials, successes })
}
