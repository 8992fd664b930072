//! MILP engine adaptor.
//!
//! Implements `CpSolver` on top of `good_lp` with the pure-Rust `microlp`
//! backend. Every `CpModel` constraint is rewritten as mixed-integer linear
//! rows; reification uses big-M terms computed from variable bounds, so the
//! rewriting is exact for bounded integer models.
//!
//! # Encoding
//!
//! With enforcement literals `e₁..eₖ`, let `s = Σ (1 - eᵢ)` (zero exactly
//! when all are true). Then:
//!
//! | Constraint | Rows |
//! |------------|------|
//! | `expr <= b` | `expr <= b + M·s` |
//! | `expr >= b` | `expr >= b - M·s` |
//! | `expr == b` | both of the above |
//! | `expr != b` | `expr <= b-1 + M·(s+z)`, `expr >= b+1 - M·(s+1-z)`, `z` binary |
//! | AND(lᵢ) | `lᵢ + s >= 1` for each i |
//! | OR(lᵢ) | `Σ lᵢ + s >= 1` |
//! | `a ⇒ b` | `b >= a` |
//! | `t = max(xᵢ)` | `t >= xᵢ`; `t <= Σ xᵢ` for 0/1 operands, selector binaries otherwise |
//!
//! # Time limit
//! The budget is handed to the backend, which checks it between simplex
//! pivots and stops on its own. A stop with an incumbent is reported as
//! `Feasible`; a stop before any incumbent is `Unknown`.
//!
//! # Warm start
//! Model hints are completed into a full assignment (`CpModel::complete_hint`)
//! and passed to the backend together with values for the auxiliary
//! binaries of the translation, so the search holds an incumbent from the
//! root node on.
//!
//! # Reference
//! Williams (2013), "Model Building in Mathematical Programming", Ch. 9

use std::time::{Duration, Instant};

use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolutionStatus, SolverModel, Variable, WithInitialSolution, WithTimeLimit,
};
use tracing::{debug, warn};

use super::model::{Constraint, CpModel, LinearExpr, Literal, ObjectiveSense, Relation, VarId};
use super::solver::{CpSolution, CpSolver, SolveStats, SolveStatus, SolverConfig};

/// `CpSolver` backed by a mixed-integer linear programming engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilpSolver;

impl MilpSolver {
    /// Creates the adaptor.
    pub fn new() -> Self {
        Self
    }
}

/// What the backend returned.
enum Outcome {
    Solved {
        values: Vec<i64>,
        status: SolveStatus,
        nodes: u64,
    },
    Infeasible,
    OutOfTime,
    Failed(String),
}

/// Maps a backend stop reason onto the engine-neutral status.
fn solved_status(status: SolutionStatus) -> SolveStatus {
    match status {
        SolutionStatus::Optimal => SolveStatus::Optimal,
        SolutionStatus::TimeLimit | SolutionStatus::GapLimit => SolveStatus::Feasible,
    }
}

impl CpSolver for MilpSolver {
    fn name(&self) -> &str {
        "milp"
    }

    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        let started = Instant::now();
        let outcome = run(model, started, config.time_limit);
        let wall_time = started.elapsed();

        match outcome {
            Outcome::Solved {
                values,
                status,
                nodes,
            } => {
                let stats = SolveStats {
                    wall_time,
                    branches: Some(nodes),
                };
                if config.verify_solution {
                    if let Err(e) = model.check(&values) {
                        warn!(
                            model = model.name(),
                            error = %e,
                            "engine returned an invalid assignment"
                        );
                        return CpSolution::error(
                            format!("engine assignment rejected: {e}"),
                            stats,
                        );
                    }
                }
                if status == SolveStatus::Feasible {
                    debug!(
                        model = model.name(),
                        limit_s = config.time_limit.as_secs_f64(),
                        nodes,
                        "time limit reached, returning incumbent"
                    );
                }
                let objective = model.objective_value(&values);
                CpSolution::found(status, values, objective, stats)
            }
            Outcome::Infeasible => {
                CpSolution::without_values(SolveStatus::Infeasible, SolveStats::timed(wall_time))
            }
            Outcome::OutOfTime => {
                warn!(
                    model = model.name(),
                    limit_s = config.time_limit.as_secs_f64(),
                    "time limit reached without a solution"
                );
                CpSolution::without_values(SolveStatus::Unknown, SolveStats::timed(wall_time))
            }
            Outcome::Failed(msg) => CpSolution::error(msg, SolveStats::timed(wall_time)),
        }
    }
}

/// Big-M translation state: one column per model variable.
struct Columns<'a> {
    model: &'a CpModel,
    cols: Vec<Variable>,
}

impl Columns<'_> {
    fn var(&self, id: VarId) -> Expression {
        Expression::from(self.cols[id.index()])
    }

    fn linear(&self, expr: &LinearExpr) -> Expression {
        let mut e = Expression::from(expr.constant() as f64);
        for &(v, c) in expr.terms() {
            e += self.cols[v.index()] * (c as f64);
        }
        e
    }

    fn literal(&self, lit: Literal) -> Expression {
        let col = self.cols[lit.var().id().index()];
        if lit.is_negated() {
            Expression::from(1.0) - col
        } else {
            Expression::from(col)
        }
    }

    /// `Σ (1 - eᵢ)`: zero iff every enforcement literal holds.
    fn slack(&self, enforcement: &[Literal]) -> Expression {
        let mut e = Expression::from(0.0);
        for &lit in enforcement {
            e += self.literal(!lit);
        }
        e
    }
}

fn run(model: &CpModel, started: Instant, time_limit: Duration) -> Outcome {
    let mut vars = ProblemVariables::new();
    let cols: Vec<Variable> = model
        .variables()
        .iter()
        .map(|def| {
            if def.is_bool {
                vars.add(variable().binary())
            } else {
                vars.add(variable().integer().min(def.lb as f64).max(def.ub as f64))
            }
        })
        .collect();

    // Auxiliary binaries must exist before the variable set is consumed.
    let aux: Vec<Vec<Variable>> = model
        .constraints()
        .iter()
        .map(|c| {
            let count = match c {
                Constraint::Linear {
                    relation: Relation::Ne,
                    ..
                } => 1,
                Constraint::MaxEquality { operands, .. } if !all_binary(model, operands) => {
                    operands.len()
                }
                _ => 0,
            };
            (0..count).map(|_| vars.add(variable().binary())).collect()
        })
        .collect();

    let columns = Columns { model, cols };
    let objective = match model.objective() {
        Some(o) => (o.sense, columns.linear(&o.expr)),
        None => (ObjectiveSense::Minimize, Expression::from(0.0)),
    };
    let budget = time_limit.saturating_sub(started.elapsed()).as_secs_f64();
    let mut problem = match objective {
        (ObjectiveSense::Maximize, expr) => vars.maximise(expr).using(microlp),
        (ObjectiveSense::Minimize, expr) => vars.minimise(expr).using(microlp),
    }
    .with_time_limit(budget);

    if let Some(values) = model.complete_hint() {
        debug!(model = model.name(), "warm start from completed hint");
        problem = problem.with_initial_solution(warm_start(&columns, &aux, &values));
    }

    let mut rows = 0usize;
    for (constraint, aux) in model.constraints().iter().zip(&aux) {
        for row in translate(&columns, constraint, aux) {
            problem.add_constraint(row);
            rows += 1;
        }
    }
    debug!(
        model = model.name(),
        columns = columns.cols.len(),
        rows,
        budget_s = budget,
        "translated model to MILP"
    );

    match problem.solve() {
        Ok(solution) => {
            let status = solved_status(solution.status());
            let values = columns
                .cols
                .iter()
                .map(|&c| solution.value(c).round() as i64)
                .collect();
            let nodes = solution.into_inner().stats().nodes_solved;
            Outcome::Solved {
                values,
                status,
                nodes,
            }
        }
        Err(ResolutionError::Infeasible) => Outcome::Infeasible,
        // the backend stopped at the limit before finding any incumbent
        Err(ResolutionError::Other(reason)) => {
            debug!(model = model.name(), reason, "engine stopped without a solution");
            Outcome::OutOfTime
        }
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

/// Start values for every column, auxiliary binaries included.
fn warm_start(
    columns: &Columns<'_>,
    aux: &[Vec<Variable>],
    values: &[i64],
) -> Vec<(Variable, f64)> {
    let mut start: Vec<(Variable, f64)> = columns
        .cols
        .iter()
        .zip(values)
        .map(|(&col, &value)| (col, value as f64))
        .collect();

    for (constraint, aux) in columns.model.constraints().iter().zip(aux) {
        match constraint {
            Constraint::Linear {
                expr,
                relation: Relation::Ne,
                rhs,
                ..
            } => {
                // z = 1 selects the `expr >= rhs + 1` side
                let above = expr.evaluate(values) > *rhs;
                start.extend(aux.iter().map(|&z| (z, if above { 1.0 } else { 0.0 })));
            }
            Constraint::MaxEquality { operands, .. } if !aux.is_empty() => {
                let max = operands.iter().map(|v| values[v.index()]).max();
                let chosen = operands
                    .iter()
                    .position(|v| Some(values[v.index()]) == max)
                    .unwrap_or(0);
                start.extend(
                    aux.iter()
                        .enumerate()
                        .map(|(i, &y)| (y, if i == chosen { 1.0 } else { 0.0 })),
                );
            }
            _ => {}
        }
    }
    start
}

fn all_binary(model: &CpModel, vars: &[VarId]) -> bool {
    vars.iter().all(|&v| {
        let def = model.var(v);
        def.lb >= 0 && def.ub <= 1
    })
}

fn translate(columns: &Columns<'_>, c: &Constraint, aux: &[Variable]) -> Vec<good_lp::Constraint> {
    let model = columns.model;
    let mut rows = Vec::new();
    match c {
        Constraint::Linear {
            expr,
            relation,
            rhs,
            enforcement,
        } => {
            let rhs = *rhs;
            // constant rows carry no column; drop them when they hold
            if expr.terms().is_empty()
                && enforcement.is_empty()
                && relation.holds(expr.constant(), rhs)
            {
                return rows;
            }
            let (lo, hi) = model.expr_bounds(expr);
            let lhs = columns.linear(expr);
            let s = columns.slack(enforcement);
            match relation {
                Relation::Le => rows.push(le_row(lhs, rhs, (hi - rhs).max(0), s)),
                Relation::Ge => rows.push(ge_row(lhs, rhs, (rhs - lo).max(0), s)),
                Relation::Eq => {
                    rows.push(le_row(lhs.clone(), rhs, (hi - rhs).max(0), s.clone()));
                    rows.push(ge_row(lhs, rhs, (rhs - lo).max(0), s));
                }
                Relation::Ne => {
                    let z = Expression::from(aux[0]);
                    let below = s.clone() + z.clone();
                    let above = s + Expression::from(1.0) - z;
                    rows.push(le_row(lhs.clone(), rhs - 1, (hi - rhs + 1).max(0), below));
                    rows.push(ge_row(lhs, rhs + 1, (rhs + 1 - lo).max(0), above));
                }
            }
        }
        Constraint::BoolAnd {
            literals,
            enforcement,
        } => {
            let s = columns.slack(enforcement);
            for &lit in literals {
                let lhs = columns.literal(lit) + s.clone();
                let one = Expression::from(1.0);
                rows.push(constraint!(lhs >= one));
            }
        }
        Constraint::BoolOr {
            literals,
            enforcement,
        } => {
            let mut lhs = columns.slack(enforcement);
            for &lit in literals {
                lhs += columns.literal(lit);
            }
            let one = Expression::from(1.0);
            rows.push(constraint!(lhs >= one));
        }
        Constraint::Implication {
            antecedent,
            consequent,
        } => {
            let a = columns.literal(*antecedent);
            let b = columns.literal(*consequent);
            rows.push(constraint!(b >= a));
        }
        Constraint::MaxEquality { target, operands } => {
            let t = columns.var(*target);
            for &x in operands {
                let target = t.clone();
                let operand = columns.var(x);
                rows.push(constraint!(target >= operand));
            }
            if aux.is_empty() {
                let mut sum = Expression::from(0.0);
                for &x in operands {
                    sum += columns.var(x);
                }
                rows.push(constraint!(t <= sum));
            } else {
                let t_ub = model.var(*target).ub;
                let mut selected = Expression::from(0.0);
                for (&x, &y) in operands.iter().zip(aux) {
                    let m = (t_ub - model.var(x).lb).max(0) as f64;
                    let bound = columns.var(x) + (Expression::from(1.0) - y) * m;
                    let target = t.clone();
                    rows.push(constraint!(target <= bound));
                    selected += Expression::from(y);
                }
                let one = Expression::from(1.0);
                rows.push(constraint!(selected == one));
            }
        }
    }
    rows
}

/// `lhs <= rhs + m·s`
fn le_row(lhs: Expression, rhs: i64, m: i64, s: Expression) -> good_lp::Constraint {
    let bound = Expression::from(rhs as f64) + s * (m as f64);
    constraint!(lhs <= bound)
}

/// `lhs >= rhs - m·s`
fn ge_row(lhs: Expression, rhs: i64, m: i64, s: Expression) -> good_lp::Constraint {
    let bound = Expression::from(rhs as f64) - s * (m as f64);
    constraint!(lhs >= bound)
}
