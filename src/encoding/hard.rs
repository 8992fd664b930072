//! Hard constraint families.
//!
//! Each `add_*` function appends one family to the model and returns the
//! number of constraints it emitted, for logging.
//!
//! | Family | Rule |
//! |--------|------|
//! | Gender separation | no room holds both genders on a day |
//! | Room incompatibility | a scheduled patient avoids its incompatible rooms |
//! | Surgeon capacity | daily surgery time within the surgeon's budget |
//! | Mandatory admission | every mandatory patient is scheduled |
//! | Admission window | release (all) and due (mandatory) days respected |
//! | Room capacity | occupants per room-day within capacity |

use serde::{Deserialize, Serialize};

use super::presence::PresenceTable;
use super::DecisionVars;
use crate::cp::{BoolVar, CpModel, LinearExpr, Relation};
use crate::models::{Gender, Instance};

/// Which patients count against a surgeon's daily budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurgeonScope {
    /// Mandatory patients only.
    #[default]
    MandatoryOnly,
    /// Mandatory patients, and optional patients when they are scheduled.
    AllPatients,
}

/// Per room-day: `max(male presents) + max(female presents) <= 1`.
///
/// Room-days where one gender has no candidate are skipped.
pub fn add_gender_separation(
    model: &mut CpModel,
    instance: &Instance,
    presence: &PresenceTable,
) -> usize {
    let mut emitted = 0;
    for d in 0..presence.days() {
        for r in 0..presence.rooms() {
            let (male, female): (Vec<_>, Vec<_>) = presence
                .at(d, r)
                .partition(|&(p, _)| instance.patients[p].gender == Gender::Male);
            if male.is_empty() || female.is_empty() {
                continue;
            }

            let any_male = model.new_bool_var(format!("any_male_r{r}_d{d}"));
            let any_female = model.new_bool_var(format!("any_female_r{r}_d{d}"));
            model.add_max_equality(any_male, male.into_iter().map(|(_, lit)| lit));
            model.add_max_equality(any_female, female.into_iter().map(|(_, lit)| lit));
            model.add_linear(LinearExpr::sum([any_male, any_female]), Relation::Le, 1);
            emitted += 1;
        }
    }
    emitted
}

/// `room != index(r)` for every incompatible room `r`, when scheduled.
pub fn add_room_incompatibility(
    model: &mut CpModel,
    instance: &Instance,
    vars: &[DecisionVars],
) -> usize {
    let mut emitted = 0;
    for (patient, dv) in instance.patients.iter().zip(vars) {
        for room_id in &patient.incompatible_room_ids {
            let Some(index) = instance.room_index(room_id) else {
                continue;
            };
            model
                .add_linear(dv.room.into(), Relation::Ne, index as i64)
                .only_enforce_if(dv.scheduled);
            emitted += 1;
        }
    }
    emitted
}

/// Per (day, surgeon): `Σ duration · operates_today <= max_surgery_time[day]`.
///
/// A patient operates on its admission day. Mandatory patients get
/// `is_today ⇔ admission_day == d` and `is_today ⇒ scheduled`; with
/// [`SurgeonScope::AllPatients`] optional patients contribute through
/// `operates ⇔ is_today ∧ scheduled`, leaving unscheduled ones free.
/// Emitted only for (day, surgeon) pairs with at least one contributor.
pub fn add_surgeon_capacity(
    model: &mut CpModel,
    instance: &Instance,
    vars: &[DecisionVars],
    scope: SurgeonScope,
) -> usize {
    let mut emitted = 0;
    for d in 0..instance.days {
        for surgeon in &instance.surgeons {
            let mut load = LinearExpr::new();
            let mut contributors = 0;

            for (patient, dv) in instance.patients.iter().zip(vars) {
                if patient.surgeon_id != surgeon.id {
                    continue;
                }
                if !patient.mandatory && scope == SurgeonScope::MandatoryOnly {
                    continue;
                }

                let is_today = model.new_bool_var(format!("{}_surgery_day_{d}", patient.id));
                model
                    .add_linear(dv.admission_day.into(), Relation::Eq, d)
                    .only_enforce_if(is_today);
                model
                    .add_linear(dv.admission_day.into(), Relation::Ne, d)
                    .only_enforce_if(!is_today);

                let operates = if patient.mandatory {
                    model.add_implication(is_today, dv.scheduled);
                    is_today
                } else {
                    operating_literal(model, &patient.id, is_today, dv.scheduled, d)
                };

                load.add_term(operates, patient.surgery_duration);
                contributors += 1;
            }

            if contributors > 0 {
                let budget = surgeon.capacity_on(d).unwrap_or(0);
                model.add_linear(load, Relation::Le, budget);
                emitted += 1;
            }
        }
    }
    emitted
}

/// `operates ⇔ is_today ∧ scheduled`.
fn operating_literal(
    model: &mut CpModel,
    id: &str,
    is_today: BoolVar,
    scheduled: BoolVar,
    d: i64,
) -> BoolVar {
    let operates = model.new_bool_var(format!("{id}_operates_d{d}"));
    model
        .add_bool_and(vec![is_today.into(), scheduled.into()])
        .only_enforce_if(operates);
    model
        .add_bool_or(vec![!is_today, !scheduled])
        .only_enforce_if(!operates);
    operates
}

/// `scheduled == 1` for every mandatory patient.
pub fn add_mandatory_admission(
    model: &mut CpModel,
    instance: &Instance,
    vars: &[DecisionVars],
) -> usize {
    let mut emitted = 0;
    for (patient, dv) in instance.patients.iter().zip(vars) {
        if patient.mandatory {
            model.add_linear(dv.scheduled.into(), Relation::Eq, 1);
            emitted += 1;
        }
    }
    emitted
}

/// `admission_day >= release` (all patients) and `admission_day <= due`
/// (mandatory patients), both only when scheduled.
pub fn add_admission_windows(
    model: &mut CpModel,
    instance: &Instance,
    vars: &[DecisionVars],
) -> usize {
    let mut emitted = 0;
    for (patient, dv) in instance.patients.iter().zip(vars) {
        model
            .add_linear(dv.admission_day.into(), Relation::Ge, patient.surgery_release_day)
            .only_enforce_if(dv.scheduled);
        emitted += 1;

        if patient.mandatory {
            if let Some(due) = patient.surgery_due_day {
                model
                    .add_linear(dv.admission_day.into(), Relation::Le, due)
                    .only_enforce_if(dv.scheduled);
                emitted += 1;
            }
        }
    }
    emitted
}

/// Per room-day: `Σ present <= capacity`, for room-days with any presence literal.
pub fn add_room_capacity(
    model: &mut CpModel,
    instance: &Instance,
    presence: &PresenceTable,
) -> usize {
    let mut emitted = 0;
    for d in 0..presence.days() {
        for (r, room) in instance.rooms.iter().enumerate() {
            let occupancy = LinearExpr::sum(presence.at(d, r).map(|(_, lit)| lit));
            if occupancy.terms().is_empty() {
                continue;
            }
            model.add_linear(occupancy, Relation::Le, room.capacity);
            emitted += 1;
        }
    }
    emitted
}
