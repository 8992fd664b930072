//! Greedy starting plan.
//!
//! Mandatory patients are placed first, earliest due day first, then
//! optional patients by release day. Each patient takes its earliest
//! admission day with a usable room; among the usable rooms of that day it
//! takes the one adding the fewest mixed-age room-days. A room is usable
//! when the whole stay keeps capacity and gender separation, the room is
//! compatible, and the surgeon has time left on the admission day.
//!
//! The plan only seeds the engine through solution hints. It is stricter
//! than the model (whole stays, every patient's surgery charged per scope),
//! so a plan it finds is always a feasible assignment.

use super::hard::SurgeonScope;
use super::DecisionVars;
use crate::cp::CpModel;
use crate::models::{Instance, Patient};

/// Admission day and room index of a placed patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    pub day: i64,
    pub room: usize,
}

/// Beds and surgery time taken so far.
struct Ledger<'a> {
    instance: &'a Instance,
    scope: SurgeonScope,
    /// `[day][room]` occupant patient indices.
    occupants: Vec<Vec<Vec<usize>>>,
    /// `[surgeon][day]` booked surgery time.
    booked: Vec<Vec<i64>>,
}

impl<'a> Ledger<'a> {
    fn new(instance: &'a Instance, scope: SurgeonScope) -> Self {
        let days = instance.days.max(0) as usize;
        Self {
            instance,
            scope,
            occupants: vec![vec![Vec::new(); instance.rooms.len()]; days],
            booked: vec![vec![0; days]; instance.surgeons.len()],
        }
    }

    /// Horizon days occupied by a stay starting on `day`.
    fn stay(&self, patient: &Patient, day: i64) -> Vec<usize> {
        (day.max(0)..self.instance.days)
            .filter(|&t| patient.occupies(day, t))
            .map(|t| t as usize)
            .collect()
    }

    /// Surgeon whose budget the patient's surgery is charged to.
    fn charged_surgeon(&self, patient: &Patient) -> Option<usize> {
        if !patient.mandatory && self.scope == SurgeonScope::MandatoryOnly {
            return None;
        }
        self.instance
            .surgeons
            .iter()
            .position(|s| s.id == patient.surgeon_id)
    }

    fn fits(&self, p: usize, day: i64, room: usize) -> bool {
        let patient = &self.instance.patients[p];
        let target = &self.instance.rooms[room];
        if patient.is_incompatible_with(&target.id) {
            return false;
        }
        let beds_free = self.stay(patient, day).into_iter().all(|t| {
            let here = &self.occupants[t][room];
            (here.len() as i64) < target.capacity
                && here
                    .iter()
                    .all(|&o| self.instance.patients[o].gender == patient.gender)
        });
        if !beds_free {
            return false;
        }
        match self.charged_surgeon(patient) {
            Some(s) => {
                let budget = self.instance.surgeons[s].capacity_on(day).unwrap_or(0);
                self.booked[s][day as usize] + patient.surgery_duration <= budget
            }
            None => true,
        }
    }

    /// Room-days that would start mixing age groups.
    fn mixing_added(&self, p: usize, day: i64, room: usize) -> usize {
        let patient = &self.instance.patients[p];
        self.stay(patient, day)
            .into_iter()
            .filter(|&t| {
                let mut groups = self.occupants[t][room]
                    .iter()
                    .map(|&o| &self.instance.patients[o].age_group);
                match groups.next() {
                    Some(first) => *first != patient.age_group && groups.all(|g| g == first),
                    None => false,
                }
            })
            .count()
    }

    /// Earliest day with a usable room, and the mixing that room adds.
    fn best_placement(&self, p: usize) -> Option<(Placement, usize)> {
        let patient = &self.instance.patients[p];
        let last_day = self.instance.days - 1;
        let last = if patient.mandatory {
            patient.surgery_due_day.unwrap_or(last_day).min(last_day)
        } else {
            last_day
        };

        (patient.surgery_release_day.max(0)..=last).find_map(|day| {
            (0..self.instance.rooms.len())
                .filter(|&room| self.fits(p, day, room))
                .map(|room| (Placement { day, room }, self.mixing_added(p, day, room)))
                .min_by_key(|&(_, mixing)| mixing)
        })
    }

    fn place(&mut self, p: usize, placement: Placement) {
        let patient = &self.instance.patients[p];
        for t in self.stay(patient, placement.day) {
            self.occupants[t][placement.room].push(p);
        }
        if let Some(s) = self.charged_surgeon(patient) {
            self.booked[s][placement.day as usize] += patient.surgery_duration;
        }
    }
}

/// Greedy plan, one entry per patient in instance order.
///
/// Returns `None` when some mandatory patient cannot be placed. Optional
/// patients are placed only when their reward exceeds the mixing penalty
/// they add.
pub(crate) fn greedy_plan(
    instance: &Instance,
    scope: SurgeonScope,
) -> Option<Vec<Option<Placement>>> {
    let mut ledger = Ledger::new(instance, scope);
    let mut plan = vec![None; instance.patients.len()];

    let mut order: Vec<usize> = (0..instance.patients.len()).collect();
    order.sort_by_key(|&p| {
        let patient = &instance.patients[p];
        (
            !patient.mandatory,
            patient.surgery_due_day.unwrap_or(i64::MAX),
            patient.surgery_release_day,
        )
    });

    let weights = &instance.weights;
    for p in order {
        let mandatory = instance.patients[p].mandatory;
        match ledger.best_placement(p) {
            Some((placement, mixing))
                if mandatory
                    || weights.unscheduled_optional > weights.room_mixed_age * mixing as i64 =>
            {
                ledger.place(p, placement);
                plan[p] = Some(placement);
            }
            None if mandatory => return None,
            _ => {}
        }
    }
    Some(plan)
}

/// Hints the decision variables of every patient from a plan.
///
/// Unplaced patients are hinted unscheduled, on their release day in the
/// first room.
pub(crate) fn add_hints(
    model: &mut CpModel,
    instance: &Instance,
    vars: &[DecisionVars],
    plan: &[Option<Placement>],
) {
    let last_day = instance.days - 1;
    for ((patient, dv), placement) in instance.patients.iter().zip(vars).zip(plan) {
        let (scheduled, day, room) = match placement {
            Some(placed) => (1, placed.day, placed.room as i64),
            None => (0, patient.surgery_release_day.min(last_day).max(0), 0),
        };
        model.add_hint(dv.scheduled, scheduled);
        model.add_hint(dv.admission_day, day);
        model.add_hint(dv.room, room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Room, Surgeon, Weights};

    fn base(rooms: &[i64], surgeon: Vec<i64>) -> Instance {
        let mut inst = Instance::new(surgeon.len() as i64)
            .with_surgeon(Surgeon::new("s0", surgeon))
            .with_age_groups(["young", "old"])
            .with_weights(Weights::new(1, 5, 10));
        for (i, &capacity) in rooms.iter().enumerate() {
            inst = inst.with_room(Room::new(format!("r{i}")).with_capacity(capacity));
        }
        inst
    }

    fn patient(id: &str, gender: Gender, group: &str) -> Patient {
        Patient::new(id, gender)
            .with_age_group(group)
            .with_surgery("s0", 60)
    }

    #[test]
    fn test_genders_kept_apart() {
        let inst = base(&[2], vec![240, 240])
            .with_patient(patient("p0", Gender::Male, "young").mandatory_within(0, 1))
            .with_patient(patient("p1", Gender::Female, "young").mandatory_within(0, 1));
        let plan = greedy_plan(&inst, SurgeonScope::MandatoryOnly).unwrap();

        assert_eq!(plan[0], Some(Placement { day: 0, room: 0 }));
        assert_eq!(plan[1], Some(Placement { day: 1, room: 0 }));
    }

    #[test]
    fn test_surgeon_budget_spreads_days() {
        let inst = base(&[1, 1], vec![60, 60])
            .with_patient(patient("p0", Gender::Male, "young").mandatory_within(0, 1))
            .with_patient(patient("p1", Gender::Male, "young").mandatory_within(0, 1));
        let plan = greedy_plan(&inst, SurgeonScope::MandatoryOnly).unwrap();

        assert_eq!(plan[0].map(|p| p.day), Some(0));
        assert_eq!(plan[1].map(|p| p.day), Some(1));
    }

    #[test]
    fn test_whole_stay_blocks_bed() {
        let inst = base(&[1], vec![240, 240, 240])
            .with_patient(
                patient("p0", Gender::Male, "young")
                    .mandatory_within(0, 0)
                    .with_stay(2),
            )
            .with_patient(patient("p1", Gender::Male, "young").mandatory_within(0, 2));
        let plan = greedy_plan(&inst, SurgeonScope::MandatoryOnly).unwrap();

        // discharge day 2 frees the bed
        assert_eq!(plan[1], Some(Placement { day: 2, room: 0 }));
    }

    #[test]
    fn test_prefers_room_without_mixing() {
        let inst = base(&[2, 2], vec![240])
            .with_patient(patient("p0", Gender::Male, "young").mandatory_within(0, 0))
            .with_patient(patient("p1", Gender::Male, "old").mandatory_within(0, 0));
        let plan = greedy_plan(&inst, SurgeonScope::MandatoryOnly).unwrap();

        assert_eq!(plan[0].map(|p| p.room), Some(0));
        assert_eq!(plan[1].map(|p| p.room), Some(1));
    }

    #[test]
    fn test_incompatible_room_skipped() {
        let inst = base(&[1, 1], vec![240]).with_patient(
            patient("p0", Gender::Female, "old")
                .mandatory_within(0, 0)
                .incompatible_with("r0"),
        );
        let plan = greedy_plan(&inst, SurgeonScope::MandatoryOnly).unwrap();
        assert_eq!(plan[0].map(|p| p.room), Some(1));
    }

    #[test]
    fn test_unplaceable_mandatory() {
        let inst = base(&[1], vec![240])
            .with_patient(patient("p0", Gender::Male, "young").mandatory_within(0, 0))
            .with_patient(patient("p1", Gender::Male, "young").mandatory_within(0, 0));
        assert_eq!(greedy_plan(&inst, SurgeonScope::MandatoryOnly), None);
    }

    #[test]
    fn test_optional_scope_and_reward() {
        let inst = base(&[2], vec![60])
            .with_patient(patient("p0", Gender::Male, "young").mandatory_within(0, 0))
            .with_patient(patient("p1", Gender::Male, "young").optional_from(0));

        // optional surgeries are free under the default scope
        let plan = greedy_plan(&inst, SurgeonScope::MandatoryOnly).unwrap();
        assert!(plan[1].is_some());
        let plan = greedy_plan(&inst, SurgeonScope::AllPatients).unwrap();
        assert_eq!(plan[1], None);

        let unrewarded = inst.with_weights(Weights::new(1, 5, 0));
        let plan = greedy_plan(&unrewarded, SurgeonScope::MandatoryOnly).unwrap();
        assert_eq!(plan[1], None);
    }
}
