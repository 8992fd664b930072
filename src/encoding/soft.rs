//! Soft penalties and the objective.
//!
//! ```text
//! maximize  w_opt · Σ_{optional} scheduled
//!         - w_delay · Σ_{mandatory} delay
//!         - w_mixed · Σ_{room-days} at_least_two
//! ```

use super::presence::PresenceTable;
use super::DecisionVars;
use crate::cp::{BoolVar, CpModel, IntVar, LinearExpr, Relation};
use crate::models::Instance;

/// Penalty variables created for the objective.
#[derive(Debug, Clone, Default)]
pub struct SoftTerms {
    /// `(patient index, delay)` for mandatory patients.
    pub delays: Vec<(usize, IntVar)>,
    /// `(day, room, at_least_two)` for room-days that can mix age groups.
    pub mixed_age: Vec<(usize, usize, BoolVar)>,
    /// Age-group flags created, one per group per room-day with candidates.
    pub age_flags: usize,
}

/// Adds the penalty variables and sets the maximization objective.
pub fn compose(
    model: &mut CpModel,
    instance: &Instance,
    vars: &[DecisionVars],
    presence: &PresenceTable,
) -> SoftTerms {
    let mut terms = SoftTerms::default();
    add_delays(model, instance, vars, &mut terms);
    add_age_mixing(model, instance, presence, &mut terms);

    let w = &instance.weights;
    let mut objective = LinearExpr::new();
    for (patient, dv) in instance.patients.iter().zip(vars) {
        if !patient.mandatory {
            objective.add_term(dv.scheduled, w.unscheduled_optional);
        }
    }
    for &(_, delay) in &terms.delays {
        objective.add_term(delay, -w.patient_delay);
    }
    for &(_, _, mixed) in &terms.mixed_age {
        objective.add_term(mixed, -w.room_mixed_age);
    }
    model.maximize(objective);

    terms
}

/// `delay = admission_day - release` when scheduled, `0` otherwise.
fn add_delays(
    model: &mut CpModel,
    instance: &Instance,
    vars: &[DecisionVars],
    terms: &mut SoftTerms,
) {
    for (p, (patient, dv)) in instance.patients.iter().zip(vars).enumerate() {
        if !patient.mandatory {
            continue;
        }
        let delay = model.new_int_var(0, instance.days, format!("delay_{}", patient.id));
        let shifted = LinearExpr::from(delay)
            .term(dv.admission_day, -1)
            .plus(patient.surgery_release_day);
        model
            .add_linear(shifted, Relation::Eq, 0)
            .only_enforce_if(dv.scheduled);
        model
            .add_linear(delay.into(), Relation::Eq, 0)
            .only_enforce_if(!dv.scheduled);
        terms.delays.push((p, delay));
    }
}

/// Flags the age groups present in each room-day; with more than one group
/// in the instance, `at_least_two ⇔ Σ flags >= 2` is penalized.
fn add_age_mixing(
    model: &mut CpModel,
    instance: &Instance,
    presence: &PresenceTable,
    terms: &mut SoftTerms,
) {
    let groups = instance.age_groups.len();
    for d in 0..presence.days() {
        for r in 0..presence.rooms() {
            let occupants: Vec<_> = presence.at(d, r).collect();
            if occupants.is_empty() {
                continue;
            }

            let flags: Vec<BoolVar> = instance
                .age_groups
                .iter()
                .map(|g| model.new_bool_var(format!("room_{r}_d{d}_has_{g}")))
                .collect();
            terms.age_flags += flags.len();

            for (p, present) in occupants {
                if let Some(g) = instance.age_group_index(&instance.patients[p].age_group) {
                    model.add_implication(present, flags[g]);
                }
            }

            if groups <= 1 {
                continue;
            }
            let total = model.new_int_var(0, groups as i64, format!("age_group_count_r{r}_d{d}"));
            let mut count = LinearExpr::from(total);
            for &flag in &flags {
                count.add_term(flag, -1);
            }
            model.add_linear(count, Relation::Eq, 0);

            let at_least_two = model.new_bool_var(format!("at_least_two_ages_r{r}_d{d}"));
            model
                .add_linear(total.into(), Relation::Ge, 2)
                .only_enforce_if(at_least_two);
            model
                .add_linear(total.into(), Relation::Le, 1)
                .only_enforce_if(!at_least_two);
            terms.mixed_age.push((d, r, at_least_two));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{CpSolver, MilpSolver, SolverConfig};
    use crate::encoding::{hard, ReachabilityGuard};
    use crate::models::{Gender, Patient, Room, Surgeon, Weights};

    fn build(instance: &Instance) -> (CpModel, Vec<DecisionVars>, SoftTerms) {
        let mut model = CpModel::new("soft");
        let vars = DecisionVars::allocate(&mut model, instance);
        let presence =
            PresenceTable::build(&mut model, instance, &vars, ReachabilityGuard::Disabled);
        hard::add_mandatory_admission(&mut model, instance, &vars);
        hard::add_admission_windows(&mut model, instance, &vars);
        let terms = compose(&mut model, instance, &vars, &presence);
        (model, vars, terms)
    }

    fn base(groups: &[&str]) -> Instance {
        Instance::new(3)
            .with_room(Room::new("r0").with_capacity(2))
            .with_surgeon(Surgeon::uniform("s0", 3, 100))
            .with_age_groups(groups.iter().copied())
            .with_weights(Weights::new(3, 5, 10))
    }

    fn patient(id: &str, group: &str) -> Patient {
        Patient::new(id, Gender::Female)
            .with_age_group(group)
            .with_surgery("s0", 10)
    }

    #[test]
    fn test_delay_terms_for_mandatory_only() {
        let inst = base(&["adult"])
            .with_patient(patient("p0", "adult").mandatory_within(1, 2))
            .with_patient(patient("p1", "adult").optional_from(0));
        let (model, vars, terms) = build(&inst);

        assert_eq!(terms.delays.len(), 1);
        assert_eq!(terms.delays[0].0, 0);
        // one group: flags only, no mixing penalty
        assert!(terms.mixed_age.is_empty());
        assert_eq!(terms.age_flags, 3);

        // delay = admission - release
        let mut fixed = model.clone();
        fixed.add_linear(vars[0].scheduled.into(), Relation::Eq, 1);
        fixed.add_linear(vars[0].admission_day.into(), Relation::Eq, 2);
        let solution = MilpSolver::new().solve(&fixed, &SolverConfig::default());
        assert_eq!(solution.value(terms.delays[0].1), Some(1));
    }

    #[test]
    fn test_objective_weights() {
        let inst = base(&["adult"])
            .with_patient(patient("p0", "adult").mandatory_within(0, 2))
            .with_patient(patient("p1", "adult").optional_from(0));
        let (model, vars, terms) = build(&inst);
        let objective = model.objective().map(|o| o.expr.clone()).unwrap_or_default();

        let coeff = |id: crate::cp::VarId| {
            objective
                .terms()
                .iter()
                .filter(|(v, _)| *v == id)
                .map(|(_, c)| *c)
                .sum::<i64>()
        };
        assert_eq!(coeff(vars[1].scheduled.id()), 10);
        assert_eq!(coeff(vars[0].scheduled.id()), 0);
        assert_eq!(coeff(terms.delays[0].1.id()), -3);
    }

    #[test]
    fn test_mixing_penalized() {
        let inst = base(&["young", "old"])
            .with_patient(patient("p0", "young").mandatory_within(0, 0))
            .with_patient(patient("p1", "old").mandatory_within(0, 0));
        let (model, _, terms) = build(&inst);
        // one room, three days
        assert_eq!(terms.mixed_age.len(), 3);
        assert_eq!(terms.age_flags, 6);

        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());
        assert!(solution.is_solution_found());
        let (d, _, flag) = terms.mixed_age[0];
        assert_eq!(d, 0);
        assert_eq!(solution.bool_value(flag), Some(true));
        // both admitted on day 0 in the same room: one mixed room-day
        assert_eq!(solution.objective_value, Some(-5));
    }

    #[test]
    fn test_same_group_not_mixed() {
        let inst = base(&["young", "old"])
            .with_patient(patient("p0", "young").mandatory_within(0, 0))
            .with_patient(patient("p1", "young").mandatory_within(0, 0));
        let (model, _, terms) = build(&inst);
        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());
        assert!(terms.mixed_age.iter().all(|&(_, _, f)| solution.bool_value(f) == Some(false)));
        assert_eq!(solution.objective_value, Some(0));
    }
}
