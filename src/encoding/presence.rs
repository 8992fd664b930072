//! Presence predicate.
//!
//! `present(p, d, r)` holds iff patient `p` is scheduled, its stay
//! `[admission_day, admission_day + los)` covers day `d`, and it is placed
//! in room `r`. The discharge day is not occupied, so one patient may leave
//! a bed on the day another arrives.
//!
//! Each literal is reified in both directions:
//!
//! | Literal | Meaning | Depends on |
//! |---------|---------|------------|
//! | `start_ok` | `admission_day <= d` | (p, d) |
//! | `end_ok` | `admission_day + los > d` | (p, d) |
//! | `in_range` | `start_ok ∧ end_ok` | (p, d) |
//! | `in_room` | `room == r` | (p, r) |
//! | `present` | `scheduled ∧ in_range ∧ in_room` | (p, d, r) |
//!
//! The table is built once per model and shared by gender separation, room
//! capacity and the age-mixing penalty, so all three see the same literal
//! for the same triple.

use serde::{Deserialize, Serialize};

use super::DecisionVars;
use crate::cp::{BoolVar, CpModel, LinearExpr, Relation};
use crate::models::{Instance, Patient};

/// Which (patient, day) pairs get presence literals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReachabilityGuard {
    /// Skip day `d` for a patient when `d + 1 < length_of_stay`.
    ///
    /// A stay starting on day 0 does cover those early days, so this
    /// under-counts occupancy at the start of the horizon. Kept as the
    /// default for compatibility with published solutions.
    #[default]
    Legacy,
    /// Build presence for every day of the horizon.
    Disabled,
}

impl ReachabilityGuard {
    /// Whether the (patient, day) pair is left without presence literals.
    #[inline]
    pub fn skips(self, day: i64, length_of_stay: i64) -> bool {
        match self {
            Self::Legacy => day + 1 < length_of_stay,
            Self::Disabled => false,
        }
    }
}

/// Dense `(patient, day, room)` table of presence literals.
#[derive(Debug, Clone)]
pub struct PresenceTable {
    patients: usize,
    days: usize,
    rooms: usize,
    cells: Vec<Option<BoolVar>>,
}

impl PresenceTable {
    /// Creates the presence literals of every patient.
    pub(crate) fn build(
        model: &mut CpModel,
        instance: &Instance,
        vars: &[DecisionVars],
        guard: ReachabilityGuard,
    ) -> Self {
        let patients = vars.len();
        let days = instance.days.max(0) as usize;
        let rooms = instance.rooms.len();
        let mut table = Self {
            patients,
            days,
            rooms,
            cells: vec![None; patients * days * rooms],
        };

        for (p, (patient, dv)) in instance.patients.iter().zip(vars).enumerate() {
            let reachable: Vec<i64> = (0..instance.days)
                .filter(|&d| !guard.skips(d, patient.length_of_stay))
                .collect();
            if reachable.is_empty() {
                continue;
            }

            let in_room: Vec<BoolVar> = (0..rooms)
                .map(|r| room_literal(model, patient, dv, r as i64))
                .collect();

            for d in reachable {
                let in_range = stay_literal(model, patient, dv, d);
                for (r, &room_lit) in in_room.iter().enumerate() {
                    let present = model.new_bool_var(format!("{}_present_r{r}_d{d}", patient.id));
                    model
                        .add_bool_and(vec![dv.scheduled.into(), in_range.into(), room_lit.into()])
                        .only_enforce_if(present);
                    model
                        .add_bool_or(vec![!dv.scheduled, !in_range, !room_lit])
                        .only_enforce_if(!present);
                    let idx = table.index(p, d as usize, r);
                    table.cells[idx] = Some(present);
                }
            }
        }

        table
    }

    #[inline]
    fn index(&self, patient: usize, day: usize, room: usize) -> usize {
        (patient * self.days + day) * self.rooms + room
    }

    /// Presence literal of a triple, if one was built.
    pub fn get(&self, patient: usize, day: usize, room: usize) -> Option<BoolVar> {
        if patient >= self.patients || day >= self.days || room >= self.rooms {
            return None;
        }
        self.cells[self.index(patient, day, room)]
    }

    /// `(patient index, literal)` pairs that may occupy `room` on `day`.
    pub fn at(&self, day: usize, room: usize) -> impl Iterator<Item = (usize, BoolVar)> + '_ {
        (0..self.patients).filter_map(move |p| self.get(p, day, room).map(|lit| (p, lit)))
    }

    /// Number of presence literals built.
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Whether no literal was built.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Horizon length.
    pub fn days(&self) -> usize {
        self.days
    }

    /// Number of rooms.
    pub fn rooms(&self) -> usize {
        self.rooms
    }
}

/// `in_range ⇔ admission_day <= d ∧ admission_day + los > d`.
fn stay_literal(model: &mut CpModel, patient: &Patient, dv: &DecisionVars, d: i64) -> BoolVar {
    let adm = LinearExpr::from(dv.admission_day);
    let id = &patient.id;

    let start_ok = model.new_bool_var(format!("{id}_start_le_d{d}"));
    model.add_linear(adm.clone(), Relation::Le, d).only_enforce_if(start_ok);
    model.add_linear(adm.clone(), Relation::Ge, d + 1).only_enforce_if(!start_ok);

    // admission_day + los > d  ⇔  admission_day >= d - los + 1
    let end_ok = model.new_bool_var(format!("{id}_end_gt_d{d}"));
    model
        .add_linear(adm.clone(), Relation::Ge, d - patient.length_of_stay + 1)
        .only_enforce_if(end_ok);
    model
        .add_linear(adm, Relation::Le, d - patient.length_of_stay)
        .only_enforce_if(!end_ok);

    let in_range = model.new_bool_var(format!("{id}_in_range_d{d}"));
    model
        .add_bool_and(vec![start_ok.into(), end_ok.into()])
        .only_enforce_if(in_range);
    model
        .add_bool_or(vec![!start_ok, !end_ok])
        .only_enforce_if(!in_range);
    in_range
}

/// `in_room ⇔ room == r`.
fn room_literal(model: &mut CpModel, patient: &Patient, dv: &DecisionVars, r: i64) -> BoolVar {
    let in_room = model.new_bool_var(format!("{}_in_r{r}", patient.id));
    model
        .add_linear(dv.room.into(), Relation::Eq, r)
        .only_enforce_if(in_room);
    model
        .add_linear(dv.room.into(), Relation::Ne, r)
        .only_enforce_if(!in_room);
    in_room
}
