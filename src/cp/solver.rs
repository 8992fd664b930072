//! Engine seam: solver trait, configuration and results.
//!
//! The model builder never searches. It hands a finished `CpModel` to a
//! `CpSolver` and reads back a `CpSolution`. Engines are opaque; a
//! time-limited run that found something but could not prove optimality
//! reports `Feasible`, never `Optimal`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::model::{BoolVar, CpModel, VarId};

/// Default wall-clock budget for a solve.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(600);

/// Outcome category of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Proven optimal solution.
    Optimal,
    /// Solution found, optimality not proven (e.g. time limit hit).
    Feasible,
    /// Proven to have no solution.
    Infeasible,
    /// Nothing found within the budget.
    Unknown,
    /// The engine failed or rejected the model.
    ModelError,
}

impl SolveStatus {
    /// Whether variable values are available.
    pub fn has_solution(self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }
}

/// Solve configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock budget (default: 600 s).
    pub time_limit: Duration,
    /// Re-check returned values against the model (default: true).
    pub verify_solution: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: DEFAULT_TIME_LIMIT,
            verify_solution: true,
        }
    }
}

impl SolverConfig {
    /// Sets the wall-clock budget.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Enables or disables solution verification.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_solution = verify;
        self
    }
}

/// Search diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveStats {
    /// Wall time consumed by the solve.
    pub wall_time: Duration,
    /// Branches / nodes explored, if the engine reports them.
    pub branches: Option<u64>,
}

impl SolveStats {
    /// Stats carrying only the wall time.
    pub fn timed(wall_time: Duration) -> Self {
        Self {
            wall_time,
            branches: None,
        }
    }
}

/// Result of a solve.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Outcome.
    pub status: SolveStatus,
    /// One value per model variable; empty unless a solution was found.
    pub values: Vec<i64>,
    /// Objective value of `values`, if the model has an objective.
    pub objective_value: Option<i64>,
    /// Diagnostics.
    pub stats: SolveStats,
    /// Engine message for `ModelError` (or other notes).
    pub message: Option<String>,
}

impl CpSolution {
    /// A solution carrying values.
    pub fn found(
        status: SolveStatus,
        values: Vec<i64>,
        objective_value: Option<i64>,
        stats: SolveStats,
    ) -> Self {
        Self {
            status,
            values,
            objective_value,
            stats,
            message: None,
        }
    }

    /// A result without values (infeasible or unknown).
    pub fn without_values(status: SolveStatus, stats: SolveStats) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value: None,
            stats,
            message: None,
        }
    }

    /// An engine failure.
    pub fn error(message: impl Into<String>, stats: SolveStats) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::without_values(SolveStatus::ModelError, stats)
        }
    }

    /// Whether variable values are available.
    pub fn is_solution_found(&self) -> bool {
        self.status.has_solution()
    }

    /// Value of a variable, if a solution was found.
    pub fn value(&self, var: impl Into<VarId>) -> Option<i64> {
        if !self.is_solution_found() {
            return None;
        }
        self.values.get(var.into().index()).copied()
    }

    /// Value of a boolean variable, if a solution was found.
    pub fn bool_value(&self, var: BoolVar) -> Option<bool> {
        self.value(var).map(|v| v != 0)
    }
}

/// A constraint optimization engine.
///
/// Implementations must be usable from several threads at once: each call
/// to `solve` gets its own model and must not share search state with
/// other calls.
pub trait CpSolver: Send + Sync {
    /// Engine name for logging.
    fn name(&self) -> &str;

    /// Solves `model` within `config.time_limit`.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}
