//! Patient admission scheduling.
//!
//! Assigns each patient an admission day and a room over a planning
//! horizon, subject to gender separation, room suitability and capacity,
//! surgeon workload and release/due windows, while trading off admission
//! delay, age mixing in rooms and elective throughput.
//!
//! The crate encodes an instance as a constraint model and hands it to an
//! optimization engine; it never searches itself.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Patient`, `Room`, `Surgeon`, `Weights`,
//!   `Instance`, and the output `SolutionDocument`
//! - **`validation`**: Input integrity checks (duplicate IDs, dangling
//!   references, unsatisfiable mandatory windows)
//! - **`cp`**: Engine-agnostic `CpModel`, the `CpSolver` seam, and the
//!   `MilpSolver` adaptor
//! - **`encoding`**: Decision variables, presence predicate, hard
//!   constraint families, soft objective, solution decoding
//! - **`scheduler`**: `AdmissionScheduler` pipeline, plan KPIs, plan audit
//!
//! # Logging
//!
//! Model size, solve outcome and failures are reported through `tracing`.
//! The crate installs no subscriber.
//!
//! # References
//!
//! - Demeester et al. (2010), "A hybrid tabu search algorithm for
//!   automatically assigning patients to beds"
//! - Ceschia & Schaerf (2011), "Local search and lower bounds for the
//!   patient admission scheduling problem"
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

pub mod cp;
pub mod encoding;
pub mod models;
pub mod scheduler;
pub mod validation;
