//! Constraint programming layer.
//!
//! Separates what is solved from how it is solved. The admission encoding
//! writes a `CpModel` (boolean and bounded integer variables, reifiable
//! linear constraints, boolean AND/OR/implication, max-equality, linear
//! objective) and any `CpSolver` implementation solves it.
//!
//! | Engine | Backend | Notes |
//! |--------|---------|-------|
//! | `MilpSolver` | `good_lp` + `microlp` | big-M translation, pure Rust |
//!
//! # Reference
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"
//! - Williams (2013), "Model Building in Mathematical Programming"

mod milp;
mod model;
mod solver;

pub use milp::MilpSolver;
pub use model::{
    BoolVar, CheckError, Constraint, CpModel, Enforce, IntVar, LinearExpr, Literal, Objective,
    ObjectiveSense, Relation, VarDef, VarId,
};
pub use solver::{
    CpSolution, CpSolver, SolveStats, SolveStatus, SolverConfig, DEFAULT_TIME_LIMIT,
};
