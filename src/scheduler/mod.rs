//! Admission scheduler, plan KPIs and audit.
//!
//! `AdmissionScheduler` runs the whole pipeline: validate the instance,
//! build the constraint model, solve it with the configured engine and
//! decode the result.
//!
//! # KPI
//!
//! `PlanKpi` computes plan metrics: admissions, delay, age mixing and bed
//! occupancy.
//!
//! # Audit
//!
//! `audit_plan` re-checks every hard constraint on a decoded plan,
//! independently of the model that produced it.
//!
//! # References
//!
//! - Demeester et al. (2010), "A hybrid tabu search algorithm for
//!   automatically assigning patients to beds"
//! - Ceschia & Schaerf (2011), "Local search and lower bounds for the
//!   patient admission scheduling problem"

mod audit;
mod kpi;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub use audit::audit_plan;
pub use kpi::PlanKpi;

use crate::cp::{CpSolver, MilpSolver, SolveStats, SolveStatus, SolverConfig};
use crate::encoding::{AdmissionModelBuilder, DecodeError, EncodingOptions};
use crate::models::{AdmissionSummary, Instance, SolutionDocument};
use crate::validation::ValidationError;

/// Scheduling failure.
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    /// The instance failed validation; no model was built.
    #[error("invalid instance: {} problem(s), first: {}", .0.len(), first_problem(.0))]
    InvalidInstance(Vec<ValidationError>),
    /// The engine proved infeasibility or found nothing within its budget.
    #[error("no solution (status {status:?}) after {:.2}s", .wall_time.as_secs_f64())]
    NoSolution {
        status: SolveStatus,
        wall_time: Duration,
    },
    /// The engine failed or returned an unusable solution.
    #[error("engine error: {0}")]
    Engine(String),
}

fn first_problem(errors: &[ValidationError]) -> String {
    errors.first().map(ToString::to_string).unwrap_or_default()
}

/// A solved admission plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionPlan {
    /// Output document, one record per patient.
    pub document: SolutionDocument,
    /// Admission counts.
    pub summary: AdmissionSummary,
    /// `Optimal` or `Feasible`.
    pub status: SolveStatus,
    /// Engine diagnostics.
    pub stats: SolveStats,
    /// Model objective of the plan.
    pub objective_value: Option<i64>,
}

impl AdmissionPlan {
    /// Whether the engine proved the plan optimal.
    pub fn is_proven_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

/// Validate → build → solve → decode.
///
/// # Example
/// ```no_run
/// use u_admission::models::{Gender, Instance, Patient, Room, Surgeon};
/// use u_admission::scheduler::AdmissionScheduler;
///
/// let instance = Instance::new(3)
///     .with_room(Room::new("r0"))
///     .with_surgeon(Surgeon::uniform("s0", 3, 120))
///     .with_age_groups(["adult"])
///     .with_patient(
///         Patient::new("p0", Gender::Male)
///             .mandatory_within(0, 2)
///             .with_age_group("adult")
///             .with_surgery("s0", 60),
///     );
///
/// let plan = AdmissionScheduler::new().schedule(&instance).unwrap();
/// println!("{}", plan.document.to_json_pretty().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct AdmissionScheduler<S = MilpSolver> {
    solver: S,
    config: SolverConfig,
    options: EncodingOptions,
}

impl AdmissionScheduler<MilpSolver> {
    /// Creates a scheduler backed by [`MilpSolver`] with default settings.
    pub fn new() -> Self {
        Self::with_solver(MilpSolver::new())
    }
}

impl Default for AdmissionScheduler<MilpSolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CpSolver> AdmissionScheduler<S> {
    /// Creates a scheduler backed by the given engine.
    pub fn with_solver(solver: S) -> Self {
        Self {
            solver,
            config: SolverConfig::default(),
            options: EncodingOptions::default(),
        }
    }

    /// Sets the solve configuration.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the encoding options.
    pub fn with_options(mut self, options: EncodingOptions) -> Self {
        self.options = options;
        self
    }

    /// The engine in use.
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Encoding options in use.
    pub fn options(&self) -> &EncodingOptions {
        &self.options
    }

    /// Schedules an instance.
    ///
    /// # Errors
    /// - [`SchedulerError::InvalidInstance`] when validation fails
    /// - [`SchedulerError::NoSolution`] on `Infeasible` or `Unknown`
    /// - [`SchedulerError::Engine`] on `ModelError` or an undecodable result
    pub fn schedule(&self, instance: &Instance) -> Result<AdmissionPlan, SchedulerError> {
        let model = AdmissionModelBuilder::new(instance)
            .with_options(self.options.clone())
            .build()
            .map_err(|errors| {
                warn!(problems = errors.len(), "instance rejected");
                SchedulerError::InvalidInstance(errors)
            })?;

        let solution = model.solve(&self.solver, &self.config);
        let wall_time = solution.stats.wall_time;
        info!(
            engine = self.solver.name(),
            status = ?solution.status,
            wall_time_s = wall_time.as_secs_f64(),
            branches = ?solution.stats.branches,
            objective = ?solution.objective_value,
            "solve finished"
        );

        if solution.status == SolveStatus::ModelError {
            let message = solution
                .message
                .clone()
                .unwrap_or_else(|| "engine reported a model error".to_string());
            warn!(engine = self.solver.name(), error = %message, "engine failed");
            return Err(SchedulerError::Engine(message));
        }

        let (document, summary) = model.decode(&solution).map_err(|e| match e {
            DecodeError::NoSolution(status) => {
                warn!(status = ?status, "no feasible admission plan");
                SchedulerError::NoSolution { status, wall_time }
            }
            other => SchedulerError::Engine(other.to_string()),
        })?;

        info!(
            mandatory = summary.mandatory_scheduled,
            mandatory_total = summary.mandatory_total,
            optional = summary.optional_scheduled,
            optional_total = summary.optional_total,
            "decoded admission plan"
        );

        Ok(AdmissionPlan {
            document,
            summary,
            status: solution.status,
            stats: solution.stats,
            objective_value: solution.objective_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{CpModel, CpSolution};
    use crate::encoding::{ReachabilityGuard, SurgeonScope};
    use crate::models::{AdmissionDay, Gender, Patient, Room, Surgeon, Weights};

    fn patient(id: &str, gender: Gender) -> Patient {
        Patient::new(id, gender)
            .with_age_group("adult")
            .with_surgery("s0", 60)
    }

    fn two_rooms(days: i64) -> Instance {
        Instance::new(days)
            .with_room(Room::new("r0"))
            .with_room(Room::new("r1"))
            .with_surgeon(Surgeon::uniform("s0", days as usize, 240))
            .with_age_groups(["adult"])
            .with_weights(Weights::new(1, 1, 5))
    }

    fn assert_clean(instance: &Instance, plan: &AdmissionPlan) {
        let violations = audit_plan(instance, &plan.document, SurgeonScope::MandatoryOnly);
        assert!(violations.is_empty(), "violations: {violations:?}");
    }

    /// Six days, three rooms, three age groups; five mandatory patients.
    fn ward(patients: usize) -> Instance {
        let groups = ["young", "adult", "elderly"];
        let mut instance = Instance::new(6)
            .with_room(Room::new("r0").with_capacity(2))
            .with_room(Room::new("r1").with_capacity(2))
            .with_room(Room::new("r2").with_capacity(3))
            .with_surgeon(Surgeon::uniform("s0", 6, 240))
            .with_age_groups(groups)
            .with_weights(Weights::new(2, 3, 10));
        for i in 0..patients {
            let gender = if i % 2 == 0 { Gender::Male } else { Gender::Female };
            let p = Patient::new(format!("p{i}"), gender)
                .with_age_group(groups[i % 3])
                .with_stay(1 + (i % 3) as i64)
                .with_surgery("s0", 60);
            instance = instance.with_patient(if i < 5 {
                p.mandatory_within((i % 3) as i64, 5)
            } else {
                p.optional_from((i % 4) as i64)
            });
        }
        instance
    }

    #[test]
    fn test_ward_plan_within_budget() {
        let instance = ward(14);
        let limit = Duration::from_secs(10);
        // full occupancy, so the audit checks the same rules the model enforced
        let scheduler = AdmissionScheduler::new()
            .with_config(SolverConfig::default().with_time_limit(limit))
            .with_options(
                EncodingOptions::default().with_reachability_guard(ReachabilityGuard::Disabled),
            );

        let plan = scheduler.schedule(&instance).unwrap();
        assert!(matches!(
            plan.status,
            SolveStatus::Optimal | SolveStatus::Feasible
        ));
        assert_eq!(plan.summary.mandatory_scheduled, 5);
        assert_eq!(plan.document.patients.len(), 14);
        assert!(plan.stats.wall_time < limit + Duration::from_secs(5));
        assert!(plan.stats.branches.is_some());
        assert_clean(&instance, &plan);

        let kpi = PlanKpi::calculate(&instance, &plan.document);
        assert!(kpi.all_mandatory_admitted());
        // the model may pay penalties an optimal plan would avoid, never fewer
        assert!(plan
            .objective_value
            .is_some_and(|v| v <= kpi.objective(&instance.weights)));
    }

    #[test]
    fn test_gender_scenario() {
        let instance = two_rooms(3)
            .with_patient(patient("p0", Gender::Male).mandatory_within(0, 2))
            .with_patient(patient("p1", Gender::Female).mandatory_within(0, 2));

        let plan = AdmissionScheduler::new().schedule(&instance).unwrap();
        assert!(plan.is_proven_optimal());
        assert_eq!(plan.summary.mandatory_scheduled, 2);
        assert_eq!(plan.document.patients.len(), 2);
        assert!(plan.document.patients.iter().all(|r| r.is_scheduled()));
        // no delay is needed
        assert_eq!(plan.objective_value, Some(0));
        assert_clean(&instance, &plan);
    }

    #[test]
    fn test_incompatible_room_never_assigned() {
        let instance = two_rooms(2)
            .with_patient(
                patient("p0", Gender::Male)
                    .mandatory_within(0, 1)
                    .incompatible_with("r0"),
            )
            .with_patient(
                patient("p1", Gender::Male)
                    .optional_from(0)
                    .incompatible_with("r1"),
            );

        let plan = AdmissionScheduler::new().schedule(&instance).unwrap();
        assert_eq!(
            plan.document.record("p0").and_then(|r| r.room.as_deref()),
            Some("r1")
        );
        assert_eq!(
            plan.document.record("p1").and_then(|r| r.room.as_deref()),
            Some("r0")
        );
        assert_clean(&instance, &plan);
    }

    #[test]
    fn test_zero_surgeon_capacity_day_avoided() {
        let instance = Instance::new(3)
            .with_room(Room::new("r0").with_capacity(2))
            .with_surgeon(Surgeon::new("s0", vec![0, 120, 120]))
            .with_age_groups(["adult"])
            .with_patient(patient("p0", Gender::Female).mandatory_within(0, 2))
            .with_patient(patient("p1", Gender::Female).mandatory_within(0, 2));

        let plan = AdmissionScheduler::new().schedule(&instance).unwrap();
        for record in &plan.document.patients {
            assert_ne!(record.admission_day, AdmissionDay::Day(0));
        }
        assert_clean(&instance, &plan);
    }

    #[test]
    fn test_delay_minimized_within_window() {
        let instance = two_rooms(4)
            .with_weights(Weights::new(3, 1, 5))
            .with_patient(patient("p0", Gender::Male).mandatory_within(1, 3))
            .with_patient(patient("p1", Gender::Male).mandatory_within(2, 3));

        let plan = AdmissionScheduler::new().schedule(&instance).unwrap();
        let day = |id: &str| plan.document.record(id).and_then(|r| r.admission_day.day());
        assert_eq!(day("p0"), Some(1));
        assert_eq!(day("p1"), Some(2));
        assert_eq!(plan.objective_value, Some(0));

        let kpi = PlanKpi::calculate(&instance, &plan.document);
        assert_eq!(kpi.objective(&instance.weights), 0);
        assert!(kpi.all_mandatory_admitted());
    }

    #[test]
    fn test_optional_left_out_uses_marker() {
        // one bed, one day: the mandatory patient takes it
        let instance = Instance::new(1)
            .with_room(Room::new("r0"))
            .with_surgeon(Surgeon::uniform("s0", 1, 240))
            .with_age_groups(["adult"])
            .with_weights(Weights::new(1, 1, 5))
            .with_patient(patient("p0", Gender::Male).mandatory_within(0, 0))
            .with_patient(patient("p1", Gender::Male).optional_from(0));

        let plan = AdmissionScheduler::new().schedule(&instance).unwrap();
        assert_eq!(plan.summary.optional_scheduled, 0);
        let json = plan.document.to_json_pretty().unwrap();
        assert!(json.contains("\"admission_day\": \"none\""));
        assert!(json.contains("\"operating_theater\": \"t0\""));
    }

    #[test]
    fn test_resolve_is_stable() {
        let instance = two_rooms(3)
            .with_patient(patient("p0", Gender::Male).mandatory_within(0, 2))
            .with_patient(patient("p1", Gender::Female).optional_from(1));
        let scheduler = AdmissionScheduler::new();

        let first = scheduler.schedule(&instance).unwrap();
        let second = scheduler.schedule(&instance).unwrap();
        assert_eq!(first.objective_value, second.objective_value);
        assert_clean(&instance, &first);
        assert_clean(&instance, &second);
    }

    #[test]
    fn test_concurrent_instances() {
        let instances: Vec<Instance> = (0..3)
            .map(|i| {
                two_rooms(2).with_patient(
                    patient(&format!("p{i}"), Gender::Female).mandatory_within(0, 1),
                )
            })
            .collect();
        let scheduler = &AdmissionScheduler::new();

        let plans: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = instances
                .iter()
                .map(|inst| s.spawn(move || scheduler.schedule(inst)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for (inst, plan) in instances.iter().zip(plans) {
            let plan = plan.unwrap();
            assert_eq!(plan.summary.mandatory_scheduled, 1);
            assert_clean(inst, &plan);
        }
    }

    #[test]
    fn test_invalid_instance() {
        let instance =
            two_rooms(3).with_patient(patient("p0", Gender::Male).with_surgery("ghost", 10));
        let err = AdmissionScheduler::new().schedule(&instance).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidInstance(ref e) if !e.is_empty()));
        assert!(err.to_string().contains("invalid instance"));
    }

    #[test]
    fn test_infeasible_reports_no_solution() {
        // two mandatory patients, one bed, one day
        let instance = Instance::new(1)
            .with_room(Room::new("r0"))
            .with_surgeon(Surgeon::uniform("s0", 1, 240))
            .with_age_groups(["adult"])
            .with_patient(patient("p0", Gender::Male).mandatory_within(0, 0))
            .with_patient(patient("p1", Gender::Male).mandatory_within(0, 0));

        let err = AdmissionScheduler::new().schedule(&instance).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::NoSolution {
                status: SolveStatus::Infeasible,
                ..
            }
        ));
    }

    struct FailingSolver;

    impl CpSolver for FailingSolver {
        fn name(&self) -> &str {
            "failing"
        }

        fn solve(&self, _model: &CpModel, _config: &SolverConfig) -> CpSolution {
            CpSolution::error("license expired", SolveStats::default())
        }
    }

    #[test]
    fn test_engine_error() {
        let instance =
            two_rooms(2).with_patient(patient("p0", Gender::Male).mandatory_within(0, 1));
        let err = AdmissionScheduler::with_solver(FailingSolver)
            .schedule(&instance)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Engine(ref m) if m == "license expired"));
    }

    #[test]
    fn test_options_reach_the_model() {
        let instance = two_rooms(3)
            .with_patient(patient("p0", Gender::Male).mandatory_within(0, 2).with_stay(2))
            .with_patient(patient("p1", Gender::Female).optional_from(0));
        let scheduler = AdmissionScheduler::new().with_options(
            EncodingOptions::default()
                .with_reachability_guard(ReachabilityGuard::Disabled)
                .with_surgeon_scope(SurgeonScope::AllPatients)
                .with_operating_theater("ot2"),
        );

        let plan = scheduler.schedule(&instance).unwrap();
        assert_eq!(
            plan.document.record("p0").and_then(|r| r.operating_theater.as_deref()),
            Some("ot2")
        );
        // with every stay visible, the audit agrees with the model
        let violations = audit_plan(&instance, &plan.document, SurgeonScope::AllPatients);
        assert!(violations.is_empty(), "violations: {violations:?}");
    }
}
