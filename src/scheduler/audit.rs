//! Hard-constraint audit of decoded plans.
//!
//! Re-checks an output document against the instance without looking at
//! the constraint model. Occupancy is computed from the full stay
//! `[admission_day, admission_day + los)`, clipped to the horizon, so the
//! audit also reports what a model built with the legacy reachability
//! guard can let through.

use std::collections::HashSet;

use crate::encoding::SurgeonScope;
use crate::models::{AdmissionDay, Gender, Instance, SolutionDocument, Violation, ViolationType};

/// Patients (instance indices) occupying each room on each day.
///
/// Indexed `[day][room]`. Records that do not resolve to a known patient,
/// a known room and a day inside the horizon are ignored.
pub(crate) fn occupancy(instance: &Instance, document: &SolutionDocument) -> Vec<Vec<Vec<usize>>> {
    let days = instance.days.max(0) as usize;
    let mut grid = vec![vec![Vec::new(); instance.rooms.len()]; days];

    for record in &document.patients {
        let AdmissionDay::Day(admission) = record.admission_day else {
            continue;
        };
        let Some(p) = instance.patients.iter().position(|p| p.id == record.id) else {
            continue;
        };
        let Some(r) = record.room.as_deref().and_then(|id| instance.room_index(id)) else {
            continue;
        };
        if admission < 0 || admission >= instance.days {
            continue;
        }
        let last = instance.patients[p].discharge_day(admission).min(instance.days);
        for d in admission..last {
            grid[d as usize][r].push(p);
        }
    }
    grid
}

/// Lists every hard-constraint violation in a plan.
///
/// Checks record integrity, mandatory admission, release/due windows,
/// room compatibility, surgeon budgets (under `scope`), gender separation
/// and room capacity.
pub fn audit_plan(
    instance: &Instance,
    document: &SolutionDocument,
    scope: SurgeonScope,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen = HashSet::new();

    for record in &document.patients {
        if !seen.insert(record.id.as_str()) {
            violations.push(Violation::new(
                ViolationType::MalformedRecord,
                &record.id,
                format!("Patient '{}' appears more than once", record.id),
            ));
            continue;
        }
        let Some(patient) = instance.patient(&record.id) else {
            violations.push(Violation::new(
                ViolationType::MalformedRecord,
                &record.id,
                format!("Unknown patient '{}'", record.id),
            ));
            continue;
        };
        let AdmissionDay::Day(day) = record.admission_day else {
            continue;
        };

        match record.room.as_deref() {
            None => violations.push(Violation::new(
                ViolationType::MalformedRecord,
                &patient.id,
                format!("Patient '{}' admitted without a room", patient.id),
            )),
            Some(room) if instance.room(room).is_none() => violations.push(Violation::new(
                ViolationType::MalformedRecord,
                &patient.id,
                format!("Patient '{}' assigned to unknown room '{room}'", patient.id),
            )),
            Some(room) if patient.is_incompatible_with(room) => violations.push(Violation::new(
                ViolationType::IncompatibleRoom,
                &patient.id,
                format!("Patient '{}' placed in incompatible room '{room}'", patient.id),
            )),
            Some(_) => {}
        }

        if day < 0 || day >= instance.days {
            violations.push(Violation::new(
                ViolationType::WindowViolation,
                &patient.id,
                format!("Patient '{}' admitted on day {day}, outside the horizon", patient.id),
            ));
        }
        if day < patient.surgery_release_day {
            violations.push(Violation::new(
                ViolationType::WindowViolation,
                &patient.id,
                format!(
                    "Patient '{}' admitted on day {day} before release day {}",
                    patient.id, patient.surgery_release_day
                ),
            ));
        }
        if let (true, Some(due)) = (patient.mandatory, patient.surgery_due_day) {
            if day > due {
                violations.push(Violation::new(
                    ViolationType::WindowViolation,
                    &patient.id,
                    format!("Patient '{}' admitted on day {day} after due day {due}", patient.id),
                ));
            }
        }
    }

    for patient in instance.patients.iter().filter(|p| p.mandatory) {
        let admitted = document
            .record(&patient.id)
            .is_some_and(|r| r.is_scheduled());
        if !admitted {
            violations.push(Violation::new(
                ViolationType::MandatoryUnscheduled,
                &patient.id,
                format!("Mandatory patient '{}' is not admitted", patient.id),
            ));
        }
    }

    check_surgeons(instance, document, scope, &mut violations);
    check_rooms(instance, document, &mut violations);
    violations
}

fn check_surgeons(
    instance: &Instance,
    document: &SolutionDocument,
    scope: SurgeonScope,
    violations: &mut Vec<Violation>,
) {
    for surgeon in &instance.surgeons {
        for d in 0..instance.days {
            let load: i64 = document
                .patients
                .iter()
                .filter(|r| r.admission_day.day() == Some(d))
                .filter_map(|r| instance.patient(&r.id))
                .filter(|p| p.surgeon_id == surgeon.id)
                .filter(|p| p.mandatory || scope == SurgeonScope::AllPatients)
                .map(|p| p.surgery_duration)
                .sum();
            let budget = surgeon.capacity_on(d).unwrap_or(0);
            if load > budget {
                violations.push(Violation::new(
                    ViolationType::SurgeonOverload,
                    &surgeon.id,
                    format!(
                        "Surgeon '{}' has {load} surgery time on day {d}, budget {budget}",
                        surgeon.id
                    ),
                ));
            }
        }
    }
}

fn check_rooms(instance: &Instance, document: &SolutionDocument, violations: &mut Vec<Violation>) {
    for (d, rooms) in occupancy(instance, document).iter().enumerate() {
        for (room, occupants) in instance.rooms.iter().zip(rooms) {
            if occupants.len() as i64 > room.capacity {
                violations.push(Violation::new(
                    ViolationType::CapacityExceeded,
                    &room.id,
                    format!(
                        "Room '{}' holds {} patients on day {d}, capacity {}",
                        room.id,
                        occupants.len(),
                        room.capacity
                    ),
                ));
            }

            let has = |g: Gender| occupants.iter().any(|&p| instance.patients[p].gender == g);
            if has(Gender::Male) && has(Gender::Female) {
                violations.push(Violation::new(
                    ViolationType::GenderMix,
                    &room.id,
                    format!("Room '{}' mixes genders on day {d}", room.id),
                ));
            }
        }
    }
}
