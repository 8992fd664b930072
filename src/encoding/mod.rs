//! Constraint model of the admission problem.
//!
//! Translates an [`Instance`] into a [`CpModel`]: three decision variables
//! per patient, a shared presence table, the hard constraint families and
//! the soft objective. The result is solved through any [`CpSolver`] and
//! decoded back into a [`SolutionDocument`].
//!
//! # Decision variables
//!
//! | Variable | Domain | Meaning |
//! |----------|--------|---------|
//! | `scheduled[p]` | {0, 1} | patient admitted within the horizon |
//! | `admission_day[p]` | [0, days-1] | admission day |
//! | `room[p]` | [0, rooms-1] | index into the instance room list |
//!
//! `admission_day` and `room` only bind when `scheduled` is true.
//!
//! # Reference
//! Demeester et al. (2010), "A hybrid tabu search algorithm for
//! automatically assigning patients to beds", AI in Medicine 48(1)

mod decode;
pub mod hard;
mod hint;
mod presence;
pub mod soft;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use decode::{decode, DecodeError};
pub use hard::SurgeonScope;
pub use presence::{PresenceTable, ReachabilityGuard};
pub use soft::SoftTerms;

use crate::cp::{BoolVar, CpModel, CpSolution, CpSolver, IntVar, SolverConfig};
use crate::models::{AdmissionSummary, Instance, SolutionDocument};
use crate::validation::{validate_instance, ValidationError};

/// Operating theater written for every admitted patient.
pub const DEFAULT_OPERATING_THEATER: &str = "t0";

/// Encoding switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingOptions {
    /// Which (patient, day) pairs get presence literals (default: `Legacy`).
    pub reachability_guard: ReachabilityGuard,
    /// Which patients count against surgeon budgets (default: `MandatoryOnly`).
    pub surgeon_scope: SurgeonScope,
    /// Theater ID written into admitted records (default: `"t0"`).
    pub operating_theater: String,
    /// Seed the engine with a greedy plan as solution hints (default: true).
    pub warm_start: bool,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            reachability_guard: ReachabilityGuard::default(),
            surgeon_scope: SurgeonScope::default(),
            operating_theater: DEFAULT_OPERATING_THEATER.to_string(),
            warm_start: true,
        }
    }
}

impl EncodingOptions {
    /// Sets the reachability guard.
    pub fn with_reachability_guard(mut self, guard: ReachabilityGuard) -> Self {
        self.reachability_guard = guard;
        self
    }

    /// Sets the surgeon budget scope.
    pub fn with_surgeon_scope(mut self, scope: SurgeonScope) -> Self {
        self.surgeon_scope = scope;
        self
    }

    /// Sets the operating theater ID.
    pub fn with_operating_theater(mut self, theater: impl Into<String>) -> Self {
        self.operating_theater = theater.into();
        self
    }

    /// Enables or disables the greedy warm start.
    pub fn with_warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }
}

/// The three decision variables of one patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionVars {
    /// Admitted within the horizon.
    pub scheduled: BoolVar,
    /// Admission day.
    pub admission_day: IntVar,
    /// Room index.
    pub room: IntVar,
}

impl DecisionVars {
    /// Allocates the decision variables of every patient, in instance order.
    pub(crate) fn allocate(model: &mut CpModel, instance: &Instance) -> Vec<Self> {
        let last_day = instance.days - 1;
        let last_room = instance.rooms.len() as i64 - 1;
        instance
            .patients
            .iter()
            .map(|p| Self {
                scheduled: model.new_bool_var(format!("scheduled_{}", p.id)),
                admission_day: model.new_int_var(0, last_day, format!("admission_day_{}", p.id)),
                room: model.new_int_var(0, last_room, format!("room_{}", p.id)),
            })
            .collect()
    }
}

/// Number of constraints emitted per hard family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintCounts {
    pub presence_literals: usize,
    pub gender_separation: usize,
    pub room_incompatibility: usize,
    pub surgeon_capacity: usize,
    pub mandatory_admission: usize,
    pub admission_window: usize,
    pub room_capacity: usize,
}

/// Builds the constraint model of an instance.
///
/// # Example
/// ```
/// use u_admission::encoding::AdmissionModelBuilder;
/// use u_admission::models::{Gender, Instance, Patient, Room, Surgeon};
///
/// let instance = Instance::new(3)
///     .with_room(Room::new("r0"))
///     .with_surgeon(Surgeon::uniform("s0", 3, 120))
///     .with_age_groups(["adult"])
///     .with_patient(
///         Patient::new("p0", Gender::Female)
///             .mandatory_within(0, 2)
///             .with_age_group("adult")
///             .with_surgery("s0", 60),
///     );
///
/// let model = AdmissionModelBuilder::new(&instance).build().unwrap();
/// assert_eq!(model.decisions().len(), 1);
/// assert_eq!(model.counts().mandatory_admission, 1);
/// ```
pub struct AdmissionModelBuilder<'a> {
    instance: &'a Instance,
    options: EncodingOptions,
}

impl<'a> AdmissionModelBuilder<'a> {
    /// Creates a builder with default options.
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            options: EncodingOptions::default(),
        }
    }

    /// Sets encoding options.
    pub fn with_options(mut self, options: EncodingOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates the instance and builds the model.
    ///
    /// Nothing is allocated for an invalid instance.
    pub fn build(&self) -> Result<AdmissionModel<'a>, Vec<ValidationError>> {
        validate_instance(self.instance)?;
        let instance = self.instance;

        let mut model = CpModel::new("patient_admission");
        let vars = DecisionVars::allocate(&mut model, instance);
        let presence =
            PresenceTable::build(&mut model, instance, &vars, self.options.reachability_guard);

        let counts = ConstraintCounts {
            presence_literals: presence.len(),
            gender_separation: hard::add_gender_separation(&mut model, instance, &presence),
            room_incompatibility: hard::add_room_incompatibility(&mut model, instance, &vars),
            surgeon_capacity: hard::add_surgeon_capacity(
                &mut model,
                instance,
                &vars,
                self.options.surgeon_scope,
            ),
            mandatory_admission: hard::add_mandatory_admission(&mut model, instance, &vars),
            admission_window: hard::add_admission_windows(&mut model, instance, &vars),
            room_capacity: hard::add_room_capacity(&mut model, instance, &presence),
        };
        let soft = soft::compose(&mut model, instance, &vars, &presence);
        if self.options.warm_start {
            seed_hints(&mut model, instance, &vars, self.options.surgeon_scope);
        }

        debug!(
            presence = counts.presence_literals,
            gender = counts.gender_separation,
            incompatible = counts.room_incompatibility,
            surgeon = counts.surgeon_capacity,
            mandatory = counts.mandatory_admission,
            window = counts.admission_window,
            capacity = counts.room_capacity,
            delays = soft.delays.len(),
            mixed_age = soft.mixed_age.len(),
            "encoded constraint families"
        );
        info!(
            patients = instance.patients.len(),
            rooms = instance.rooms.len(),
            days = instance.days,
            variables = model.variable_count(),
            booleans = model.bool_var_count(),
            constraints = model.constraint_count(),
            "built admission model"
        );

        Ok(AdmissionModel {
            instance,
            model,
            vars,
            presence,
            soft,
            counts,
            options: self.options.clone(),
        })
    }
}

/// Hints every decision variable from the greedy plan, if one exists.
fn seed_hints(
    model: &mut CpModel,
    instance: &Instance,
    vars: &[DecisionVars],
    scope: SurgeonScope,
) {
    match hint::greedy_plan(instance, scope) {
        Some(plan) => {
            let placed = |mandatory: bool| {
                instance
                    .patients
                    .iter()
                    .zip(&plan)
                    .filter(|(p, placement)| p.mandatory == mandatory && placement.is_some())
                    .count()
            };
            debug!(
                mandatory = placed(true),
                mandatory_total = instance.mandatory_count(),
                optional = placed(false),
                optional_total = instance.optional_count(),
                "seeded greedy plan as solution hint"
            );
            hint::add_hints(model, instance, vars, &plan);
        }
        None => debug!("greedy plan left a mandatory patient out; solving without hint"),
    }
}

/// A built admission model, ready to solve.
#[derive(Debug, Clone)]
pub struct AdmissionModel<'a> {
    instance: &'a Instance,
    model: CpModel,
    vars: Vec<DecisionVars>,
    presence: PresenceTable,
    soft: SoftTerms,
    counts: ConstraintCounts,
    options: EncodingOptions,
}

impl<'a> AdmissionModel<'a> {
    /// The instance this model encodes.
    pub fn instance(&self) -> &'a Instance {
        self.instance
    }

    /// The underlying constraint model.
    pub fn cp_model(&self) -> &CpModel {
        &self.model
    }

    /// Decision variables, one entry per patient in instance order.
    pub fn decisions(&self) -> &[DecisionVars] {
        &self.vars
    }

    /// The shared presence table.
    pub fn presence(&self) -> &PresenceTable {
        &self.presence
    }

    /// Penalty variables of the objective.
    pub fn soft_terms(&self) -> &SoftTerms {
        &self.soft
    }

    /// Constraints emitted per hard family.
    pub fn counts(&self) -> ConstraintCounts {
        self.counts
    }

    /// Options the model was built with.
    pub fn options(&self) -> &EncodingOptions {
        &self.options
    }

    /// Hands the model to an engine.
    pub fn solve<S: CpSolver + ?Sized>(&self, solver: &S, config: &SolverConfig) -> CpSolution {
        solver.solve(&self.model, config)
    }

    /// Decodes an engine result into the output document.
    pub fn decode(
        &self,
        solution: &CpSolution,
    ) -> Result<(SolutionDocument, AdmissionSummary), DecodeError> {
        decode(self.instance, &self.vars, solution, &self.options.operating_theater)
    }
}
